use thiserror::Error;

/// User-facing failures of the prediction service. The `Display` text is what
/// the UI shows; the technical cause is logged where the error is created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error(
        "Failed to fetch upcoming matches. The league might be misspelled or there are no upcoming games this week."
    )]
    FixturesUnavailable,

    #[error(
        "Failed to get prediction for {match_details}. The model may have been unable to find sufficient data."
    )]
    PredictionUnavailable { match_details: String },
}

impl ServiceError {
    pub fn prediction(match_details: &str) -> Self {
        Self::PredictionUnavailable {
            match_details: match_details.to_string(),
        }
    }
}

/// Startup configuration problems. These are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API_KEY environment variable not set")]
    MissingApiKey,

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
