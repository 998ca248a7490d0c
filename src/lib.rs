//! League fixtures and model-generated match predictions.
//!
//! A cycle lists this week's fixtures for a league, then predicts every
//! fixture concurrently. Results flow back as [`state::Delta`]s and are applied
//! to [`state::AppState`] by a single owner.

pub mod config;
pub mod demo_feed;
pub mod error;
pub mod gemini;
pub mod http_client;
pub mod logging;
pub mod model;
pub mod provider;
pub mod service;
pub mod state;
pub mod win_prob;
