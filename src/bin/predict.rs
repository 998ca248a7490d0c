use matchcast::config::Config;
use matchcast::logging;
use matchcast::model::FixtureWithPrediction;
use matchcast::provider::collect_cycle;
use matchcast::service::service_from_config;
use matchcast::state::{AppState, CycleView};
use matchcast::win_prob::team_labels;

// Runs one fetch-and-predict cycle without the TUI and prints the settled
// cards. Usage: predict [--json] [league words...]
fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let mut json = false;
    let mut words = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => json = true,
            _ => words.push(arg),
        }
    }

    let config = Config::from_env()?;
    logging::init_stderr()?;
    let league = if words.is_empty() {
        config.default_league.clone()
    } else {
        words.join(" ")
    };

    let service = service_from_config(&config)?;
    let state = collect_cycle(service, &league);

    if json {
        println!("{}", serde_json::to_string_pretty(&state.report())?);
    } else {
        print_report(&state);
    }

    if state.view() == CycleView::Failed {
        if json && let Some(err) = &state.error {
            eprintln!("error: {err}");
        }
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(state: &AppState) {
    let league = state.cycle_league.as_deref().unwrap_or("-");
    match state.view() {
        CycleView::Failed => {
            println!("Failed to fetch matches: {}", state.error.as_deref().unwrap_or(""));
            return;
        }
        CycleView::NoMatches => {
            println!("Could not find any upcoming matches for \"{league}\" this week.");
            return;
        }
        CycleView::Idle | CycleView::Loading => {
            println!("No league given.");
            return;
        }
        CycleView::Cards => {}
    }

    println!("{league}: {} matches", state.items.len());
    for item in &state.items {
        println!();
        print_item(item);
    }
}

fn print_item(item: &FixtureWithPrediction) {
    println!("{}", item.match_details());
    println!("  {}", item.fixture.date_location);
    if let Some(err) = &item.error {
        println!("  ! {err}");
        return;
    }
    let Some(p) = &item.prediction else {
        println!("  (no prediction)");
        return;
    };
    let w = p.win_probability;
    let (team_a, team_b) = team_labels(item.match_details());
    println!("  Outcome: {} ({})", p.predicted_outcome, p.predicted_score);
    println!(
        "  {team_a} {:>3.0}% | Draw {:>3.0}% | {team_b} {:>3.0}%",
        w.team_a, w.draw, w.team_b
    );
    println!("  Confidence: {:.0}%", p.confidence_level);
    for (i, factor) in p.key_factors.iter().enumerate() {
        println!("  {}. {}", i + 1, factor);
    }
    println!("  Outlook: {}", p.future_outlook);
}
