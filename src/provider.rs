use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Instant;

use crate::service::PredictionService;
use crate::state::{AppState, Delta, ProviderCommand, apply_delta};

/// Background thread that turns commands into deltas for the UI loop.
pub fn spawn_provider(
    service: Arc<dyn PredictionService>,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) {
    thread::spawn(move || {
        while let Ok(cmd) = cmd_rx.recv() {
            match latest_command(cmd, &cmd_rx) {
                ProviderCommand::RunCycle { epoch, league } => {
                    run_cycle(&service, epoch, &league, &tx);
                }
            }
        }
        tracing::debug!("provider command channel closed");
    });
}

/// Skips over commands that queued up behind `cmd`; only the newest one is
/// worth running.
pub fn latest_command(cmd: ProviderCommand, cmd_rx: &Receiver<ProviderCommand>) -> ProviderCommand {
    let mut latest = cmd;
    while let Ok(next) = cmd_rx.try_recv() {
        let ProviderCommand::RunCycle { epoch, .. } = &latest;
        tracing::debug!(epoch, "superseded before it ran");
        latest = next;
    }
    latest
}

/// Lists fixtures for `league`, then launches one prediction worker per
/// fixture. Returns once the workers are spawned; their results arrive on
/// `tx` in completion order.
pub fn run_cycle(
    service: &Arc<dyn PredictionService>,
    epoch: u64,
    league: &str,
    tx: &Sender<Delta>,
) {
    let fixtures = match service.list_fixtures(league) {
        Ok(fixtures) => fixtures,
        Err(err) => {
            let _ = tx.send(Delta::FixturesFailed {
                epoch,
                message: err.to_string(),
            });
            return;
        }
    };

    tracing::info!(epoch, league, count = fixtures.len(), "fixtures listed");
    let _ = tx.send(Delta::FixturesListed {
        epoch,
        league: league.to_string(),
        fixtures: fixtures.clone(),
    });

    for (index, fixture) in fixtures.into_iter().enumerate() {
        let service = Arc::clone(service);
        let tx = tx.clone();
        let league = league.to_string();
        thread::spawn(move || {
            let started = Instant::now();
            let result = service.predict_fixture(&fixture, &league);
            let _ = tx.send(Delta::Log(format!(
                "[INFO] {} answered in {}ms",
                fixture.match_details,
                started.elapsed().as_millis()
            )));
            let delta = match result {
                Ok(prediction) => Delta::PredictionReady {
                    epoch,
                    index,
                    prediction,
                },
                Err(err) => Delta::PredictionFailed {
                    epoch,
                    index,
                    message: err.to_string(),
                },
            };
            let _ = tx.send(delta);
        });
    }
}

/// Runs one full cycle to completion on the calling thread and returns the
/// settled state. Used by the headless binary.
pub fn collect_cycle(service: Arc<dyn PredictionService>, league: &str) -> AppState {
    let mut state = AppState::new(league);
    let Some(ProviderCommand::RunCycle { epoch, league }) = state.begin_cycle() else {
        return state;
    };

    let (tx, rx) = mpsc::channel();
    run_cycle(&service, epoch, &league, &tx);
    drop(tx);

    // Ends when the last worker drops its sender.
    for delta in rx {
        apply_delta(&mut state, delta);
    }
    state
}
