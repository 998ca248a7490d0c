use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use matchcast::error::ServiceError;
use matchcast::gemini::prediction_from_text;
use matchcast::model::{Fixture, FixtureWithPrediction, Prediction, WinProbability};
use matchcast::provider::{collect_cycle, latest_command, run_cycle};
use matchcast::service::PredictionService;
use matchcast::state::{AppState, CycleView, Delta, ProviderCommand, apply_delta};

/// Scripted backend: a fixed listing and, per match, a delay plus either the
/// model's raw JSON text or a failure.
struct ScriptedService {
    listing: Result<Vec<Fixture>, ServiceError>,
    predictions: HashMap<String, (Duration, Option<String>)>,
    prediction_calls: AtomicUsize,
}

impl ScriptedService {
    fn listing(fixtures: Vec<Fixture>) -> Self {
        Self {
            listing: Ok(fixtures),
            predictions: HashMap::new(),
            prediction_calls: AtomicUsize::new(0),
        }
    }

    fn failing_listing() -> Self {
        Self {
            listing: Err(ServiceError::FixturesUnavailable),
            predictions: HashMap::new(),
            prediction_calls: AtomicUsize::new(0),
        }
    }

    fn answer(mut self, details: &str, delay_ms: u64, raw: &str) -> Self {
        self.predictions.insert(
            details.to_string(),
            (Duration::from_millis(delay_ms), Some(raw.to_string())),
        );
        self
    }

    fn fail(mut self, details: &str, delay_ms: u64) -> Self {
        self.predictions
            .insert(details.to_string(), (Duration::from_millis(delay_ms), None));
        self
    }
}

impl PredictionService for ScriptedService {
    fn list_fixtures(&self, _league: &str) -> Result<Vec<Fixture>, ServiceError> {
        self.listing.clone()
    }

    fn predict_fixture(&self, fixture: &Fixture, _league: &str) -> Result<Prediction, ServiceError> {
        self.prediction_calls.fetch_add(1, Ordering::SeqCst);
        let failure = || ServiceError::prediction(&fixture.match_details);
        let Some((delay, raw)) = self.predictions.get(&fixture.match_details) else {
            return Err(failure());
        };
        thread::sleep(*delay);
        let raw = raw.as_deref().ok_or_else(failure)?;
        prediction_from_text(raw, fixture).map_err(|_| failure())
    }
}

fn prediction_json(team_a: f64, draw: f64, team_b: f64) -> String {
    format!(
        r#"{{
            "predictedOutcome": "Team A Win",
            "predictedScore": "2-1",
            "winProbability": {{"teamA": {team_a}, "draw": {draw}, "teamB": {team_b}}},
            "confidenceLevel": 70,
            "keyFactors": ["Home form", "Injuries"],
            "futureOutlook": "Momentum carries into the next round."
        }}"#
    )
}

fn clasico() -> Fixture {
    Fixture::new("Real Madrid vs. Barcelona", "2024-05-01, Madrid")
}

fn win_of(item: &FixtureWithPrediction) -> WinProbability {
    item.prediction
        .as_ref()
        .expect("prediction present")
        .win_probability
}

#[test]
fn drift_within_tolerance_is_stored_unmodified() {
    let service = ScriptedService::listing(vec![clasico()]).answer(
        "Real Madrid vs. Barcelona",
        0,
        &prediction_json(40.0, 20.0, 41.0),
    );
    let state = collect_cycle(Arc::new(service), "La Liga");

    assert_eq!(state.items.len(), 1);
    let item = &state.items[0];
    assert!(!item.pending);
    assert_eq!(item.league, "La Liga");
    assert_eq!(
        win_of(item),
        WinProbability {
            team_a: 40.0,
            draw: 20.0,
            team_b: 41.0,
        }
    );
}

#[test]
fn sum_of_105_is_rescaled() {
    let service = ScriptedService::listing(vec![clasico()]).answer(
        "Real Madrid vs. Barcelona",
        0,
        &prediction_json(40.0, 20.0, 45.0),
    );
    let state = collect_cycle(Arc::new(service), "La Liga");

    assert_eq!(
        win_of(&state.items[0]),
        WinProbability {
            team_a: 38.0,
            draw: 19.0,
            team_b: 43.0,
        }
    );
}

#[test]
fn drift_beyond_tolerance_is_renormalized() {
    let service = ScriptedService::listing(vec![clasico()]).answer(
        "Real Madrid vs. Barcelona",
        0,
        &prediction_json(30.0, 10.0, 80.0),
    );
    let state = collect_cycle(Arc::new(service), "La Liga");

    assert_eq!(
        win_of(&state.items[0]),
        WinProbability {
            team_a: 25.0,
            draw: 8.0,
            team_b: 67.0,
        }
    );
}

#[test]
fn listing_failure_sets_one_top_level_error() {
    let service = Arc::new(ScriptedService::failing_listing());
    let state = collect_cycle(service.clone(), "La Liga");

    assert!(state.items.is_empty());
    assert!(!state.loading);
    assert_eq!(state.view(), CycleView::Failed);
    assert_eq!(
        state.error.as_deref(),
        Some(ServiceError::FixturesUnavailable.to_string().as_str())
    );
    assert_eq!(service.prediction_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn failed_cycle_report_carries_the_message() {
    let state = collect_cycle(Arc::new(ScriptedService::failing_listing()), "La Liga");
    let report = serde_json::to_value(state.report()).unwrap();

    assert_eq!(report["league"], "La Liga");
    assert_eq!(
        report["error"],
        ServiceError::FixturesUnavailable.to_string()
    );
    assert_eq!(report["noMatches"], false);
    assert_eq!(report["items"], serde_json::json!([]));
}

#[test]
fn settled_cycle_report_lists_items() {
    let service = ScriptedService::listing(vec![clasico()]).answer(
        "Real Madrid vs. Barcelona",
        0,
        &prediction_json(50.0, 25.0, 25.0),
    );
    let state = collect_cycle(Arc::new(service), "La Liga");
    let report = serde_json::to_value(state.report()).unwrap();

    assert!(report["error"].is_null());
    assert_eq!(report["items"][0]["matchDetails"], "Real Madrid vs. Barcelona");
    assert_eq!(report["items"][0]["league"], "La Liga");
    assert_eq!(report["items"][0]["prediction"]["winProbability"]["teamA"], 50.0);
}

#[test]
fn empty_listing_sets_no_matches() {
    let service = Arc::new(ScriptedService::listing(Vec::new()));
    let state = collect_cycle(service.clone(), "Obscure League");

    assert!(state.no_matches);
    assert!(state.items.is_empty());
    assert!(state.error.is_none());
    assert!(!state.loading);
    assert_eq!(state.view(), CycleView::NoMatches);
    assert_eq!(service.prediction_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn out_of_order_completions_keep_order_and_isolate_failures() {
    let fixtures = vec![
        Fixture::new("A vs. B", "Mon"),
        Fixture::new("C vs. D", "Tue"),
        Fixture::new("E vs. F", "Wed"),
        Fixture::new("G vs. H", "Thu"),
    ];
    // Later fixtures finish first; the second one fails.
    let service = ScriptedService::listing(fixtures.clone())
        .answer("A vs. B", 120, &prediction_json(50.0, 25.0, 25.0))
        .fail("C vs. D", 80)
        .answer("E vs. F", 40, &prediction_json(20.0, 30.0, 50.0))
        .answer("G vs. H", 0, &prediction_json(10.0, 10.0, 10.0));
    let service = Arc::new(service);
    let state = collect_cycle(service.clone(), "Test League");

    assert_eq!(state.items.len(), fixtures.len());
    for (item, fixture) in state.items.iter().zip(&fixtures) {
        assert_eq!(&item.fixture, fixture);
        assert!(!item.pending);
    }
    assert!(state.is_settled());
    assert_eq!(service.prediction_calls.load(Ordering::SeqCst), 4);

    let failed = &state.items[1];
    assert!(failed.prediction.is_none());
    assert_eq!(
        failed.error.as_deref(),
        Some(ServiceError::prediction("C vs. D").to_string().as_str())
    );

    for idx in [0, 2, 3] {
        assert!(state.items[idx].error.is_none());
        assert!(state.items[idx].prediction.is_some());
    }
    // 10/10/10 sums to 30 and gets rescaled.
    let last = win_of(&state.items[3]);
    assert_eq!(last.team_a + last.draw + last.team_b, 100.0);
    assert!(state.error.is_none());
}

#[test]
fn workers_report_timing_to_the_console() {
    let service = ScriptedService::listing(vec![Fixture::new("A vs. B", ""), clasico()])
        .answer("A vs. B", 0, &prediction_json(50.0, 25.0, 25.0))
        .fail("Real Madrid vs. Barcelona", 0);
    let state = collect_cycle(Arc::new(service), "La Liga");

    for details in ["A vs. B", "Real Madrid vs. Barcelona"] {
        let prefix = format!("[INFO] {details} answered in ");
        assert!(
            state.logs.iter().any(|line| line.starts_with(&prefix)),
            "missing timing line for {details}"
        );
    }
}

#[test]
fn queued_commands_collapse_to_the_newest() {
    let (cmd_tx, cmd_rx) = mpsc::channel();
    for epoch in 2..=4 {
        cmd_tx
            .send(ProviderCommand::RunCycle {
                epoch,
                league: format!("L{epoch}"),
            })
            .unwrap();
    }
    let first = ProviderCommand::RunCycle {
        epoch: 1,
        league: "L1".to_string(),
    };

    let ProviderCommand::RunCycle { epoch, league } = latest_command(first, &cmd_rx);
    assert_eq!(epoch, 4);
    assert_eq!(league, "L4");
    assert!(cmd_rx.try_recv().is_err());
}

#[test]
fn failure_at_one_index_leaves_siblings_untouched() {
    let mut state = AppState::new("L");
    let Some(ProviderCommand::RunCycle { epoch, league }) = state.begin_cycle() else {
        panic!("cycle should start");
    };
    apply_delta(
        &mut state,
        Delta::FixturesListed {
            epoch,
            league,
            fixtures: vec![Fixture::new("A vs. B", ""), Fixture::new("C vs. D", "")],
        },
    );
    let before = state.items[1].clone();

    apply_delta(
        &mut state,
        Delta::PredictionFailed {
            epoch,
            index: 0,
            message: "boom".to_string(),
        },
    );

    assert_eq!(state.items[0].error.as_deref(), Some("boom"));
    assert!(!state.items[0].pending);
    assert_eq!(state.items[1], before);
    assert!(state.items[1].pending);
}

#[test]
fn listing_exits_loading_before_predictions_settle() {
    let mut state = AppState::new("L");
    let Some(ProviderCommand::RunCycle { epoch, league }) = state.begin_cycle() else {
        panic!("cycle should start");
    };
    assert!(state.loading);
    apply_delta(
        &mut state,
        Delta::FixturesListed {
            epoch,
            league: league.clone(),
            fixtures: vec![Fixture::new("A vs. B", "")],
        },
    );

    assert!(!state.loading);
    assert_eq!(state.view(), CycleView::Cards);
    assert_eq!(state.pending_count(), 1);
    assert!(!state.is_settled());
    let item = &state.items[0];
    assert_eq!(item.league, league);
    assert!(item.prediction.is_none());
    assert!(item.error.is_none());
}

#[test]
fn stale_epoch_results_are_dropped() {
    let mut state = AppState::new("L");
    let Some(ProviderCommand::RunCycle { epoch: old, league }) = state.begin_cycle() else {
        panic!("cycle should start");
    };
    apply_delta(
        &mut state,
        Delta::FixturesListed {
            epoch: old,
            league,
            fixtures: vec![Fixture::new("A vs. B", "")],
        },
    );

    // A new cycle starts while the old prediction is still in flight.
    let Some(ProviderCommand::RunCycle { epoch: current, league }) = state.begin_cycle() else {
        panic!("cycle should start");
    };
    assert_eq!(current, old + 1);

    apply_delta(
        &mut state,
        Delta::PredictionFailed {
            epoch: old,
            index: 0,
            message: "late".to_string(),
        },
    );
    apply_delta(
        &mut state,
        Delta::FixturesListed {
            epoch: old,
            league: league.clone(),
            fixtures: vec![Fixture::new("X vs. Y", "")],
        },
    );
    assert!(state.items.is_empty());
    assert!(state.loading);

    apply_delta(
        &mut state,
        Delta::FixturesListed {
            epoch: current,
            league,
            fixtures: vec![Fixture::new("C vs. D", "")],
        },
    );
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.items[0].match_details(), "C vs. D");
    assert!(state.items[0].pending);
}

#[test]
fn overlapping_cycles_only_apply_the_latest() {
    let service: Arc<dyn PredictionService> = Arc::new(
        ScriptedService::listing(vec![Fixture::new("A vs. B", "")])
            .answer("A vs. B", 30, &prediction_json(60.0, 20.0, 20.0)),
    );
    let mut state = AppState::new("L");
    let (tx, rx) = mpsc::channel();

    let Some(ProviderCommand::RunCycle { epoch: first, league }) = state.begin_cycle() else {
        panic!("cycle should start");
    };
    run_cycle(&service, first, &league, &tx);
    let Some(ProviderCommand::RunCycle { epoch: second, league }) = state.begin_cycle() else {
        panic!("cycle should start");
    };
    run_cycle(&service, second, &league, &tx);
    drop(tx);

    for delta in rx {
        apply_delta(&mut state, delta);
    }

    assert_eq!(state.epoch, second);
    assert_eq!(state.items.len(), 1);
    assert!(state.is_settled());
    assert!(state.items[0].prediction.is_some());
}

#[test]
fn blank_league_runs_nothing() {
    let service = Arc::new(ScriptedService::listing(vec![clasico()]));
    let state = collect_cycle(service.clone(), "  ");
    assert_eq!(state.view(), CycleView::Idle);
    assert_eq!(state.epoch, 0);
    assert_eq!(service.prediction_calls.load(Ordering::SeqCst), 0);
}
