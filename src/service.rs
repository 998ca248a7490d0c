use std::sync::Arc;

use crate::config::Config;
use crate::demo_feed::DemoPredictor;
use crate::error::ServiceError;
use crate::gemini::GeminiPredictor;
use crate::model::{Fixture, Prediction};

/// The two calls the orchestration needs from a model backend.
///
/// Implementations convert every technical failure into a [`ServiceError`]
/// and log the cause themselves.
pub trait PredictionService: Send + Sync {
    fn list_fixtures(&self, league: &str) -> Result<Vec<Fixture>, ServiceError>;

    fn predict_fixture(&self, fixture: &Fixture, league: &str) -> Result<Prediction, ServiceError>;
}

pub fn service_from_config(config: &Config) -> anyhow::Result<Arc<dyn PredictionService>> {
    if config.demo {
        tracing::info!("using offline demo predictor");
        return Ok(Arc::new(DemoPredictor::new()));
    }
    Ok(Arc::new(GeminiPredictor::from_config(config)?))
}
