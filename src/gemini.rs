//! Gemini `generateContent` transport for the prediction service.
//!
//! Both calls are search-grounded and constrained to a JSON response schema.
//! Everything up to the service boundary is `anyhow`; the boundary logs the
//! chain and hands back a [`ServiceError`].

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::Config;
use crate::error::{ConfigError, ServiceError};
use crate::http_client::http_client;
use crate::model::{Fixture, Prediction};
use crate::service::PredictionService;
use crate::win_prob::{self, Normalization, UNKNOWN_OPPONENT};

pub const PREDICTION_TEMPERATURE: f64 = 0.5;

pub struct GeminiPredictor {
    client: &'static Client,
    api_key: String,
    endpoint: String,
}

impl GeminiPredictor {
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or(ConfigError::MissingApiKey)?;
        Ok(Self {
            client: http_client(config.request_timeout)?,
            api_key,
            endpoint: endpoint_url(&config.api_base, &config.model),
        })
    }

    fn generate(&self, body: &Value) -> Result<String> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .context("request failed")?;
        let status = resp.status();
        let raw = resp.text().context("failed reading body")?;
        if !status.is_success() {
            bail!("http {}: {}", status, raw);
        }
        response_text(&raw)
    }

    fn fetch_fixtures(&self, league: &str) -> Result<Vec<Fixture>> {
        let prompt = fixtures_prompt(league, Utc::now().date_naive());
        let body = build_request_body(&prompt, fixtures_schema(), None);
        let text = self.generate(&body)?;
        parse_fixtures_json(&text)
    }

    fn fetch_prediction(&self, fixture: &Fixture, league: &str) -> Result<Prediction> {
        let prompt = prediction_prompt(fixture, league);
        let body = build_request_body(&prompt, prediction_schema(), Some(PREDICTION_TEMPERATURE));
        let text = self.generate(&body)?;
        prediction_from_text(&text, fixture)
    }
}

impl PredictionService for GeminiPredictor {
    fn list_fixtures(&self, league: &str) -> Result<Vec<Fixture>, ServiceError> {
        self.fetch_fixtures(league).map_err(|err| {
            tracing::error!(league, error = ?err, "error fetching upcoming matches");
            ServiceError::FixturesUnavailable
        })
    }

    fn predict_fixture(&self, fixture: &Fixture, league: &str) -> Result<Prediction, ServiceError> {
        self.fetch_prediction(fixture, league).map_err(|err| {
            tracing::error!(
                league,
                match_details = %fixture.match_details,
                error = ?err,
                "error predicting match"
            );
            ServiceError::prediction(&fixture.match_details)
        })
    }
}

pub fn endpoint_url(api_base: &str, model: &str) -> String {
    format!(
        "{}/models/{}:generateContent",
        api_base.trim_end_matches('/'),
        model
    )
}

pub fn build_request_body(prompt: &str, schema: Value, temperature: Option<f64>) -> Value {
    let mut generation_config = json!({
        "responseMimeType": "application/json",
        "responseSchema": schema,
    });
    if let Some(temperature) = temperature {
        generation_config["temperature"] = json!(temperature);
    }
    json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        "tools": [{ "google_search": {} }],
        "generationConfig": generation_config,
    })
}

pub fn fixtures_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "matches": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "matchDetails": {
                            "type": "STRING",
                            "description": "Match details in 'Team A vs. Team B' format."
                        },
                        "dateLocation": {
                            "type": "STRING",
                            "description": "Date and location of the match."
                        }
                    },
                    "required": ["matchDetails", "dateLocation"]
                }
            }
        },
        "required": ["matches"]
    })
}

pub fn prediction_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "predictedOutcome": {
                "type": "STRING",
                "description": "Predicted outcome, e.g. 'Team A Win', 'Team B Win' or 'Draw'."
            },
            "predictedScore": {
                "type": "STRING",
                "description": "Most likely final score, e.g. '2-1'."
            },
            "winProbability": {
                "type": "OBJECT",
                "properties": {
                    "teamA": { "type": "NUMBER", "description": "Team A win probability (0-100)." },
                    "draw": { "type": "NUMBER", "description": "Draw probability (0-100)." },
                    "teamB": { "type": "NUMBER", "description": "Team B win probability (0-100)." }
                },
                "required": ["teamA", "draw", "teamB"]
            },
            "confidenceLevel": {
                "type": "NUMBER",
                "description": "Confidence in the prediction (0-100)."
            },
            "keyFactors": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Key factors behind the prediction, most important first."
            },
            "futureOutlook": {
                "type": "STRING",
                "description": "How both teams are likely to fare after this result."
            }
        },
        "required": [
            "predictedOutcome",
            "predictedScore",
            "winProbability",
            "confidenceLevel",
            "keyFactors",
            "futureOutlook"
        ]
    })
}

pub fn fixtures_prompt(league: &str, today: NaiveDate) -> String {
    format!(
        "Today is {today}. Using Google Search, find this week's upcoming matches for \"{league}\" \
         on livescore.com. List every match with its full match details in 'Team A vs. Team B' \
         form together with its date and location. If there are no matches this week, return an \
         empty list.",
        today = today.format("%Y-%m-%d"),
    )
}

pub fn prediction_prompt(fixture: &Fixture, league: &str) -> String {
    let (team_a, team_b) = win_prob::split_teams(&fixture.match_details);
    let team_b = team_b.unwrap_or(UNKNOWN_OPPONENT);
    format!(
        "You are an expert sports data analyst and predictive modeler. Predict the outcome of this match:\n\
         \n\
         - Sport/League: {league}\n\
         - Match Details: {details} (Team A: {team_a}, Team B: {team_b})\n\
         - Date & Location: {date_location}\n\
         \n\
         Use Google Search to gather the latest data on:\n\
         - Recent form of both teams (last 5 matches).\n\
         - Head-to-head record.\n\
         - Known injuries or suspensions of key players.\n\
         - Context such as morale, what is at stake, and weather.\n\
         \n\
         From that data:\n\
         1. Identify the key strengths, weaknesses and trends of each team.\n\
         2. Give win probabilities for Team A, a draw and Team B. They must sum to 100.\n\
         3. Give a confidence level (0-100) and explain it through the key factors.\n\
         4. Predict the most likely scoreline.\n\
         5. Summarize your reasoning in 'futureOutlook'.\n\
         6. Project how both teams may perform in their next fixtures given this result.\n\
         \n\
         Answer in the requested JSON format.",
        details = fixture.match_details,
        date_location = fixture.date_location,
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Extracts the generated text of the first candidate.
pub fn response_text(raw: &str) -> Result<String> {
    let resp: GenerateContentResponse =
        serde_json::from_str(raw.trim()).context("invalid generateContent json")?;

    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        bail!("prompt blocked: {reason}");
    }
    let Some(candidate) = resp.candidates.into_iter().next() else {
        bail!("response has no candidates");
    };

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|p| !p.thought)
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        bail!(
            "candidate has no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        );
    }
    Ok(text)
}

#[derive(Debug, Deserialize)]
struct FixturesEnvelope {
    #[serde(default)]
    matches: Option<Vec<Fixture>>,
}

pub fn parse_fixtures_json(raw: &str) -> Result<Vec<Fixture>> {
    let envelope: FixturesEnvelope =
        serde_json::from_str(raw.trim()).context("invalid fixtures json")?;
    Ok(envelope.matches.unwrap_or_default())
}

pub fn parse_prediction_json(raw: &str) -> Result<Prediction> {
    serde_json::from_str(raw.trim()).context("invalid prediction json")
}

/// Parses the generated prediction and repairs its win probabilities.
pub fn prediction_from_text(raw: &str, fixture: &Fixture) -> Result<Prediction> {
    let mut prediction = parse_prediction_json(raw)?;
    let outcome = win_prob::normalize_win_probability(&mut prediction.win_probability)
        .context("unusable win probabilities")?;
    if let Normalization::Rescaled { original_sum } = outcome {
        tracing::warn!(
            match_details = %fixture.match_details,
            original_sum,
            "probabilities sum to {original_sum}, not 100, normalizing"
        );
    }
    Ok(prediction)
}
