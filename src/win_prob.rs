use anyhow::{Result, bail};

use crate::model::WinProbability;

/// Sums within this distance of 100 are accepted as upstream rounding slack.
pub const SUM_TOLERANCE: f64 = 2.0;

pub const MATCH_SEPARATOR: &str = " vs. ";
pub const UNKNOWN_OPPONENT: &str = "Unknown opponent";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    Accepted,
    Rescaled { original_sum: f64 },
}

/// Forces the triple to sum to exactly 100 when it drifts beyond tolerance.
///
/// Team A and team B are rescaled and rounded; draw takes whatever is left so
/// rounding error never leaks into the total.
pub fn normalize_win_probability(win: &mut WinProbability) -> Result<Normalization> {
    let sum = win.sum();
    if !sum.is_finite() {
        bail!("win probabilities are not finite: {win:?}");
    }
    if (sum - 100.0).abs() <= SUM_TOLERANCE {
        return Ok(Normalization::Accepted);
    }
    if sum <= 0.0 {
        bail!("win probabilities sum to {sum}, cannot rescale");
    }

    let team_a = (win.team_a / sum * 100.0).round();
    let team_b = (win.team_b / sum * 100.0).round();
    win.team_a = team_a;
    win.team_b = team_b;
    win.draw = 100.0 - team_a - team_b;
    Ok(Normalization::Rescaled { original_sum: sum })
}

/// Splits "Team A vs. Team B". Only the first two segments are used; a missing
/// separator yields no second team.
pub fn split_teams(match_details: &str) -> (&str, Option<&str>) {
    let mut parts = match_details.split(MATCH_SEPARATOR);
    let team_a = parts.next().unwrap_or_default();
    (team_a, parts.next())
}

/// Display names for the two sides, falling back to "Team A" / "Team B" when a
/// side is blank or missing.
pub fn team_labels(match_details: &str) -> (&str, &str) {
    let (team_a, team_b) = split_teams(match_details);
    let team_a = Some(team_a.trim()).filter(|t| !t.is_empty()).unwrap_or("Team A");
    let team_b = team_b
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("Team B");
    (team_a, team_b)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

pub fn confidence_band(confidence: f64) -> ConfidenceBand {
    if confidence > 75.0 {
        ConfidenceBand::High
    } else if confidence > 50.0 {
        ConfidenceBand::Medium
    } else {
        ConfidenceBand::Low
    }
}
