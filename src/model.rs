use serde::{Deserialize, Serialize};

/// A scheduled match as returned by the fixture listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    /// "Team A vs. Team B".
    pub match_details: String,
    pub date_location: String,
}

impl Fixture {
    pub fn new(match_details: impl Into<String>, date_location: impl Into<String>) -> Self {
        Self {
            match_details: match_details.into(),
            date_location: date_location.into(),
        }
    }
}

/// Three-way outcome probabilities in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinProbability {
    pub team_a: f64,
    pub draw: f64,
    pub team_b: f64,
}

impl WinProbability {
    pub fn sum(&self) -> f64 {
        self.team_a + self.draw + self.team_b
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub predicted_outcome: String,
    pub predicted_score: String,
    pub win_probability: WinProbability,
    /// 0-100.
    pub confidence_level: f64,
    pub key_factors: Vec<String>,
    pub future_outlook: String,
}

/// One card of a fetch cycle. Created pending and settled exactly once,
/// either with a prediction or with an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureWithPrediction {
    #[serde(flatten)]
    pub fixture: Fixture,
    pub league: String,
    pub prediction: Option<Prediction>,
    pub pending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FixtureWithPrediction {
    pub fn pending(fixture: Fixture, league: &str) -> Self {
        Self {
            fixture,
            league: league.to_string(),
            prediction: None,
            pending: true,
            error: None,
        }
    }

    pub fn resolve(&mut self, prediction: Prediction) {
        self.prediction = Some(prediction);
        self.pending = false;
    }

    pub fn fail(&mut self, message: String) {
        self.error = Some(message);
        self.pending = false;
    }

    pub fn match_details(&self) -> &str {
        &self.fixture.match_details
    }
}
