use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Gauge, Paragraph, Wrap};

use matchcast::config::Config;
use matchcast::logging;
use matchcast::model::{FixtureWithPrediction, Prediction, WinProbability};
use matchcast::provider::spawn_provider;
use matchcast::service::service_from_config;
use matchcast::state::{AppState, CycleView, Delta, InputMode, ProviderCommand, apply_delta};
use matchcast::win_prob::{ConfidenceBand, confidence_band, team_labels};

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: mpsc::Sender<ProviderCommand>,
}

impl App {
    fn new(league: String, cmd_tx: mpsc::Sender<ProviderCommand>) -> Self {
        Self {
            state: AppState::new(league),
            should_quit: false,
            cmd_tx,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.input_mode == InputMode::Editing {
            self.on_edit_key(key);
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('e') | KeyCode::Char('/') => {
                self.state.input_mode = InputMode::Editing;
                self.state.help_overlay = false;
            }
            KeyCode::Char('f') | KeyCode::Enter => self.request_cycle(),
            KeyCode::Tab | KeyCode::Char('l') => self.state.cycle_preset(true),
            KeyCode::BackTab | KeyCode::Char('h') => self.state.cycle_preset(false),
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::PageDown => self.state.scroll_detail_down(),
            KeyCode::PageUp => self.state.scroll_detail_up(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.state.help_overlay = false,
            _ => {}
        }
    }

    fn on_edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                self.state.input_mode = InputMode::Normal;
                self.request_cycle();
            }
            KeyCode::Esc => self.state.input_mode = InputMode::Normal,
            KeyCode::Tab => self.state.cycle_preset(true),
            KeyCode::BackTab => self.state.cycle_preset(false),
            KeyCode::Backspace => {
                self.state.league.pop();
            }
            KeyCode::Char(c) => self.state.league.push(c),
            _ => {}
        }
    }

    fn request_cycle(&mut self) {
        let Some(cmd) = self.state.request_cycle() else {
            return;
        };
        if self.cmd_tx.send(cmd).is_err() {
            self.state.loading = false;
            self.state.push_log("[WARN] Prediction provider is not running");
        }
    }
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let config = Config::from_env()?;
    if let Some(path) = &config.log_file
        && let Err(err) = logging::init_file(path)
    {
        eprintln!("warning: logging disabled: {err:#}");
    }
    let service = service_from_config(&config)?;
    tracing::info!(model = %config.model, demo = config.demo, "starting matchcast");

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    spawn_provider(service, tx, cmd_rx);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(config.default_league.clone(), cmd_tx);
    if config.demo {
        app.state.push_log("[INFO] Demo mode: predictions are synthetic");
    }
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(36), Constraint::Min(40)])
        .split(chunks[1]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(6),
        ])
        .split(body[0]);

    render_league_input(frame, left[0], &app.state);
    render_match_list(frame, left[1], &app.state);

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, left[2]);

    match app.state.view() {
        CycleView::Cards => render_card(frame, body[1], &app.state),
        view => render_status(frame, body[1], &app.state, view),
    }

    let footer = Paragraph::new(footer_text(&app.state))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[2]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let league = state.cycle_league.as_deref().unwrap_or("-");
    let progress = if state.items.is_empty() {
        String::new()
    } else {
        format!(
            " | {}/{} predicted",
            state.items.len() - state.pending_count(),
            state.items.len()
        )
    };
    let line1 = format!("  (o)  MATCHCAST | {league}{progress}");
    let line2 = " /___\\ AI match predictions".to_string();
    let line3 = String::new();
    format!("{line1}\n{line2}\n{line3}")
}

fn footer_text(state: &AppState) -> String {
    match state.input_mode {
        InputMode::Editing => "Type league | Tab Preset | Enter Fetch & Predict | Backspace Delete | Esc Done".to_string(),
        InputMode::Normal => {
            "e Edit league | Tab/h/l Preset | Enter/f Fetch & Predict | j/k/↑/↓ Select | PgUp/PgDn Scroll | ? Help | q Quit"
                .to_string()
        }
    }
}

fn render_league_input(frame: &mut Frame, area: Rect, state: &AppState) {
    let editing = state.input_mode == InputMode::Editing;
    let (text, style) = if editing {
        (format!("{}_", state.league), Style::default().fg(Color::Yellow))
    } else {
        (state.league.clone(), Style::default())
    };
    let title = if editing { "League (editing)" } else { "League" };
    let input = Paragraph::new(text)
        .style(style)
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(input, area);
}

fn render_match_list(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Matches").borders(Borders::ALL);
    if state.items.is_empty() {
        let empty = Paragraph::new("No matches yet")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    const ROW_HEIGHT: usize = 2;
    let inner_height = area.height.saturating_sub(2) as usize;
    let visible = (inner_height / ROW_HEIGHT).max(1);
    let (start, end) = visible_range(state.selected, state.items.len(), visible);

    let mut lines = Vec::with_capacity((end - start) * ROW_HEIGHT);
    for idx in start..end {
        let item = &state.items[idx];
        let selected = idx == state.selected;
        let row_style = if selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        let prefix = if selected { "> " } else { "  " };
        lines.push(Line::styled(
            format!("{prefix}{}", item.match_details()),
            row_style.add_modifier(Modifier::BOLD),
        ));
        lines.push(Line::from(vec![
            Span::styled("    ", row_style),
            item_status_span(item),
        ]));
    }

    frame.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
}

fn item_status_span(item: &FixtureWithPrediction) -> Span<'static> {
    if item.pending {
        return Span::styled("predicting...", Style::default().fg(Color::Cyan));
    }
    if item.error.is_some() {
        return Span::styled("prediction failed", Style::default().fg(Color::Red));
    }
    match &item.prediction {
        Some(p) => Span::styled(
            format!(
                "A{:.0} D{:.0} B{:.0} | {}",
                p.win_probability.team_a,
                p.win_probability.draw,
                p.win_probability.team_b,
                p.predicted_score
            ),
            Style::default().fg(Color::Green),
        ),
        None => Span::raw("-"),
    }
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn render_status(frame: &mut Frame, area: Rect, state: &AppState, view: CycleView) {
    let league = state.cycle_league.as_deref().unwrap_or(state.league.as_str());
    let (title, body, style) = match view {
        CycleView::Loading => (
            "Loading",
            "Fetching upcoming matches...".to_string(),
            Style::default().fg(Color::Cyan),
        ),
        CycleView::Failed => (
            "Failed to Fetch Matches",
            state.error.clone().unwrap_or_default(),
            Style::default().fg(Color::Red),
        ),
        CycleView::NoMatches => (
            "No Matches Found",
            format!("Could not find any upcoming matches for \"{league}\" this week."),
            Style::default().fg(Color::Yellow),
        ),
        CycleView::Idle | CycleView::Cards => (
            "Awaiting League Selection",
            "Enter a league and press Enter to fetch and predict this week's matches.".to_string(),
            Style::default().fg(Color::DarkGray),
        ),
    };
    let panel = Paragraph::new(body)
        .style(style)
        .wrap(Wrap { trim: true })
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(panel, area);
}

fn render_card(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(item) = state.selected_item() else {
        render_status(frame, area, state, CycleView::Idle);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(5),
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .split(area);

    let header = Paragraph::new(format!(
        "{}\n{}",
        item.fixture.date_location, item.league
    ))
    .block(
        Block::default()
            .title(item.match_details().to_string())
            .borders(Borders::ALL),
    );
    frame.render_widget(header, rows[0]);

    if item.pending {
        let waiting = Paragraph::new("Analyzing form, head-to-head and injuries...")
            .style(Style::default().fg(Color::Cyan))
            .block(Block::default().title("Prediction").borders(Borders::ALL));
        frame.render_widget(waiting, rows[1]);
        return;
    }
    if let Some(err) = &item.error {
        let failed = Paragraph::new(err.as_str())
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true })
            .block(Block::default().title("Prediction").borders(Borders::ALL));
        frame.render_widget(failed, rows[1]);
        return;
    }
    let Some(prediction) = &item.prediction else {
        return;
    };

    let bars = win_bar_chart(item.match_details(), &prediction.win_probability).block(
        Block::default()
            .title(format!(
                "{} ({})",
                prediction.predicted_outcome, prediction.predicted_score
            ))
            .borders(Borders::ALL),
    );
    frame.render_widget(bars, rows[1]);

    frame.render_widget(confidence_gauge(prediction.confidence_level), rows[2]);

    let analysis = Paragraph::new(analysis_text(prediction))
        .wrap(Wrap { trim: true })
        .scroll((state.detail_scroll, 0))
        .block(Block::default().title("Analysis").borders(Borders::ALL));
    frame.render_widget(analysis, rows[3]);
}

fn win_bar_chart(match_details: &str, win: &WinProbability) -> BarChart<'static> {
    let bar = |label: &str, value: f64, color: Color| {
        let value = value.round().clamp(0.0, 100.0) as u64;
        Bar::default()
            .label(Line::from(label.to_string()))
            .value(value)
            .text_value(format!("{value}%"))
            .style(Style::default().fg(color))
            .value_style(Style::default().fg(Color::Black).bg(color))
    };

    let (team_a, team_b) = team_labels(match_details);
    BarChart::default()
        .data(BarGroup::default().bars(&[
            bar(team_a, win.team_a, Color::Blue),
            bar("Draw", win.draw, Color::Gray),
            bar(team_b, win.team_b, Color::Red),
        ]))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .group_gap(0)
        .max(100)
}

fn confidence_gauge(confidence: f64) -> Gauge<'static> {
    let percent = confidence.round().clamp(0.0, 100.0) as u16;
    let color = match confidence_band(confidence) {
        ConfidenceBand::High => Color::Green,
        ConfidenceBand::Medium => Color::Yellow,
        ConfidenceBand::Low => Color::Red,
    };
    Gauge::default()
        .block(Block::default().title("Confidence").borders(Borders::ALL))
        .gauge_style(Style::default().fg(color))
        .percent(percent)
        .label(format!("{percent}%"))
}

fn analysis_text(prediction: &Prediction) -> Text<'static> {
    let mut lines = vec![Line::styled(
        "Key factors",
        Style::default().add_modifier(Modifier::BOLD),
    )];
    for (i, factor) in prediction.key_factors.iter().enumerate() {
        lines.push(Line::raw(format!("{}. {}", i + 1, factor)));
    }
    lines.push(Line::raw(""));
    lines.push(Line::styled(
        "Outlook",
        Style::default().add_modifier(Modifier::BOLD),
    ));
    lines.push(Line::raw(prediction.future_outlook.clone()));
    Text::from(lines)
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    let start = state.logs.len().saturating_sub(4);
    state
        .logs
        .iter()
        .skip(start)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Matchcast - Help",
        "",
        "  e / /        Edit league",
        "  Tab / l      Next preset league",
        "  S-Tab / h    Previous preset league",
        "  Enter / f    Fetch & predict",
        "  j/k or ↑/↓   Select match",
        "  PgUp/PgDn    Scroll analysis",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "While editing:",
        "  Enter        Fetch & predict",
        "  Tab/S-Tab    Next/previous preset league",
        "  Esc          Stop editing",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
