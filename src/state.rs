use std::collections::VecDeque;

use serde::Serialize;

use crate::model::{Fixture, FixtureWithPrediction, Prediction};

const MAX_LOGS: usize = 200;

pub const PRESET_LEAGUES: [&str; 10] = [
    "English Premier League",
    "La Liga",
    "Serie A",
    "Bundesliga",
    "Ligue 1",
    "UEFA Champions League",
    "NBA",
    "NFL",
    "MLB",
    "Cricket World Cup",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// What the main panel should show. Derived from the cycle flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleView {
    Idle,
    Loading,
    Failed,
    NoMatches,
    Cards,
}

/// Serializable snapshot of a finished cycle.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport<'a> {
    pub league: Option<&'a str>,
    pub error: Option<&'a str>,
    pub no_matches: bool,
    pub items: &'a [FixtureWithPrediction],
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub league: String,
    pub items: Vec<FixtureWithPrediction>,
    pub loading: bool,
    pub error: Option<String>,
    pub no_matches: bool,
    /// Bumped on every cycle; completions tagged with an older value are dropped.
    pub epoch: u64,
    /// League label the current items were requested with.
    pub cycle_league: Option<String>,
    pub selected: usize,
    pub detail_scroll: u16,
    pub input_mode: InputMode,
    pub help_overlay: bool,
    pub logs: VecDeque<String>,
}

impl AppState {
    pub fn new(league: impl Into<String>) -> Self {
        Self {
            league: league.into(),
            items: Vec::new(),
            loading: false,
            error: None,
            no_matches: false,
            epoch: 0,
            cycle_league: None,
            selected: 0,
            detail_scroll: 0,
            input_mode: InputMode::Normal,
            help_overlay: false,
            logs: VecDeque::with_capacity(MAX_LOGS),
        }
    }

    /// Resets the cycle state and returns the command that starts the next
    /// cycle, or `None` when there is no league to ask about.
    pub fn begin_cycle(&mut self) -> Option<ProviderCommand> {
        let league = self.league.trim().to_string();
        if league.is_empty() {
            self.push_log("[WARN] Enter a league first");
            return None;
        }

        self.epoch += 1;
        self.loading = true;
        self.error = None;
        self.items.clear();
        self.no_matches = false;
        self.cycle_league = Some(league.clone());
        self.selected = 0;
        self.detail_scroll = 0;
        self.push_log(format!("[INFO] Fetching upcoming matches for {league}"));

        Some(ProviderCommand::RunCycle {
            epoch: self.epoch,
            league,
        })
    }

    /// Like `begin_cycle`, but refuses while the fixture listing of the
    /// current cycle is still outstanding.
    pub fn request_cycle(&mut self) -> Option<ProviderCommand> {
        if self.loading {
            self.push_log("[INFO] Still fetching matches, please wait");
            return None;
        }
        self.begin_cycle()
    }

    /// Replaces the league text with the next (or previous) preset. Free text
    /// that matches no preset jumps to the first or last entry.
    pub fn cycle_preset(&mut self, forward: bool) {
        let n = PRESET_LEAGUES.len();
        let current = PRESET_LEAGUES
            .iter()
            .position(|p| p.eq_ignore_ascii_case(self.league.trim()));
        let next = match (current, forward) {
            (Some(i), true) => (i + 1) % n,
            (Some(i), false) => (i + n - 1) % n,
            (None, true) => 0,
            (None, false) => n - 1,
        };
        self.league = PRESET_LEAGUES[next].to_string();
    }

    pub fn report(&self) -> CycleReport<'_> {
        CycleReport {
            league: self.cycle_league.as_deref(),
            error: self.error.as_deref(),
            no_matches: self.no_matches,
            items: &self.items,
        }
    }

    pub fn view(&self) -> CycleView {
        if self.loading {
            CycleView::Loading
        } else if self.error.is_some() {
            CycleView::Failed
        } else if !self.items.is_empty() {
            CycleView::Cards
        } else if self.no_matches {
            CycleView::NoMatches
        } else {
            CycleView::Idle
        }
    }

    pub fn pending_count(&self) -> usize {
        self.items.iter().filter(|i| i.pending).count()
    }

    /// True once the listing has finished and every card has settled.
    pub fn is_settled(&self) -> bool {
        !self.loading && self.pending_count() == 0
    }

    pub fn selected_item(&self) -> Option<&FixtureWithPrediction> {
        self.items.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.selected = (self.selected + 1).min(self.items.len() - 1);
        self.detail_scroll = 0;
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
        self.detail_scroll = 0;
    }

    pub fn scroll_detail_down(&mut self) {
        self.detail_scroll = self.detail_scroll.saturating_add(1);
    }

    pub fn scroll_detail_up(&mut self) {
        self.detail_scroll = self.detail_scroll.saturating_sub(1);
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    RunCycle { epoch: u64, league: String },
}

/// State changes produced off the UI thread. Every cycle-scoped variant
/// carries the epoch it belongs to.
#[derive(Debug, Clone)]
pub enum Delta {
    FixturesListed {
        epoch: u64,
        league: String,
        fixtures: Vec<Fixture>,
    },
    FixturesFailed {
        epoch: u64,
        message: String,
    },
    PredictionReady {
        epoch: u64,
        index: usize,
        prediction: Prediction,
    },
    PredictionFailed {
        epoch: u64,
        index: usize,
        message: String,
    },
    Log(String),
}

impl Delta {
    fn epoch(&self) -> Option<u64> {
        match self {
            Delta::FixturesListed { epoch, .. }
            | Delta::FixturesFailed { epoch, .. }
            | Delta::PredictionReady { epoch, .. }
            | Delta::PredictionFailed { epoch, .. } => Some(*epoch),
            Delta::Log(_) => None,
        }
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    if let Some(epoch) = delta.epoch()
        && epoch != state.epoch
    {
        tracing::debug!(epoch, current = state.epoch, "dropping stale result");
        return;
    }

    match delta {
        Delta::FixturesListed {
            league, fixtures, ..
        } => {
            state.loading = false;
            if fixtures.is_empty() {
                state.no_matches = true;
                state.push_log(format!("[INFO] No upcoming matches for {league}"));
                return;
            }
            state.push_log(format!(
                "[INFO] {} matches found, requesting predictions",
                fixtures.len()
            ));
            state.items = fixtures
                .into_iter()
                .map(|fixture| FixtureWithPrediction::pending(fixture, &league))
                .collect();
            state.selected = 0;
        }
        Delta::FixturesFailed { message, .. } => {
            state.loading = false;
            state.items.clear();
            state.push_log("[WARN] Fixture listing failed");
            state.error = Some(message);
        }
        Delta::PredictionReady {
            index, prediction, ..
        } => {
            if let Some(item) = state.items.get_mut(index) {
                item.resolve(prediction);
                let done = item.match_details().to_string();
                state.push_log(format!("[INFO] Prediction ready: {done}"));
            }
        }
        Delta::PredictionFailed { index, message, .. } => {
            if let Some(item) = state.items.get_mut(index) {
                item.fail(message);
                let failed = item.match_details().to_string();
                state.push_log(format!("[WARN] Prediction failed: {failed}"));
            }
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
