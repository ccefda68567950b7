//! Weighted-factor edge score: independently bounded sub-scores summed into
//! a total and mapped onto a tier.
//!
//! | sub-score    | range   |
//! |--------------|---------|
//! | cushion      | 0..=4   |
//! | pace         | -1..=3  |
//! | time of day  | -1..=2  |
//! | weather      | -2..=2  |

use crate::config::EdgeConfig;
use crate::data::types::ObservationSample;
use crate::strategies::types::{Recommendation, ScoreTier};
use chrono_tz::Tz;
use serde::Serialize;
use std::fmt;

/// Hours of recent readings used for the pace sub-score.
pub const PACE_WINDOW_HOURS: f64 = 3.0;

/// Whole units of disagreement between the independent forecast and its
/// comparator, capped at 4.
pub fn cushion_score(cushion: f64) -> i32 {
    if !cushion.is_finite() || cushion <= 0.0 {
        return 0;
    }
    (cushion.floor() as i32).min(4)
}

/// Rate (°/h) in the direction the edge points: warming supports "favor
/// higher", cooling supports "favor lower".
pub fn pace_score(rate_toward_edge: f64) -> i32 {
    if rate_toward_edge < 0.0 {
        -1
    } else if rate_toward_edge < 0.5 {
        0
    } else if rate_toward_edge < 1.0 {
        1
    } else if rate_toward_edge < 2.0 {
        2
    } else {
        3
    }
}

pub fn time_of_day_score(local_hour: f64) -> i32 {
    if (8.0..10.0).contains(&local_hour) {
        2
    } else if (10.0..12.0).contains(&local_hour) {
        1
    } else if (6.0..8.0).contains(&local_hour) {
        0
    } else {
        -1
    }
}

/// Clear, calm days behave like the models expect; overcast or windy days
/// do not. Missing readings score 0.
pub fn weather_modifier(cloud_cover_pct: Option<f64>, wind_mph: Option<f64>) -> i32 {
    let cloud = match cloud_cover_pct {
        Some(c) if c <= 25.0 => 1,
        Some(c) if c >= 75.0 => -1,
        _ => 0,
    };
    let wind = match wind_mph {
        Some(w) if w <= 5.0 => 1,
        Some(w) if w >= 15.0 => -1,
        _ => 0,
    };
    cloud + wind
}

pub fn tier(total: i32, config: &EdgeConfig) -> ScoreTier {
    if total >= config.strong_score {
        ScoreTier::Strong
    } else if total >= config.good_score {
        ScoreTier::Good
    } else if total >= config.lean_score {
        ScoreTier::Lean
    } else {
        ScoreTier::Skip
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreInputs {
    pub cushion: f64,
    /// Observed rate of change (°/h); `None` when too few recent readings.
    pub recent_rate: Option<f64>,
    pub direction: Recommendation,
    pub local_hour: f64,
    pub cloud_cover_pct: Option<f64>,
    pub wind_mph: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeScore {
    pub cushion: i32,
    pub pace: i32,
    pub time_of_day: i32,
    pub weather: i32,
    pub total: i32,
    pub tier: ScoreTier,
}

pub fn score_edge(inputs: &ScoreInputs, config: &EdgeConfig) -> EdgeScore {
    let pace = match (inputs.recent_rate, inputs.direction) {
        (Some(rate), Recommendation::FavorHigher) => pace_score(rate),
        (Some(rate), Recommendation::FavorLower) => pace_score(-rate),
        _ => 0,
    };
    let cushion = cushion_score(inputs.cushion);
    let time_of_day = time_of_day_score(inputs.local_hour);
    let weather = weather_modifier(inputs.cloud_cover_pct, inputs.wind_mph);
    let total = cushion + pace + time_of_day + weather;

    EdgeScore {
        cushion,
        pace,
        time_of_day,
        weather,
        total,
        tier: tier(total, config),
    }
}

/// Rate of change across readings from the last few hours.
pub fn recent_rate(samples: &[&ObservationSample], tz: &Tz) -> Option<f64> {
    let last = samples.last()?;
    let cutoff = last.hour_of_day(tz) - PACE_WINDOW_HOURS;
    let first = samples.iter().find(|s| s.hour_of_day(tz) >= cutoff)?;

    let span = last.hour_of_day(tz) - first.hour_of_day(tz);
    if span <= 0.0 {
        return None;
    }
    Some((last.temperature - first.temperature) / span)
}

/// When in the day an entry is being considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryWindow {
    /// Forecast still forming; prices move a lot.
    Early,
    Best,
    Good,
    /// Prices have caught up with the observations.
    Late,
}

impl EntryWindow {
    pub fn from_hour(local_hour: f64) -> Self {
        if local_hour < 8.0 {
            EntryWindow::Early
        } else if local_hour < 10.0 {
            EntryWindow::Best
        } else if local_hour < 12.0 {
            EntryWindow::Good
        } else {
            EntryWindow::Late
        }
    }
}

impl fmt::Display for EntryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryWindow::Early => write!(f, "EARLY (risky, forecast still forming)"),
            EntryWindow::Best => write!(f, "BEST (forecast stable, prices still cheap)"),
            EntryWindow::Good => write!(f, "GOOD (still decent value)"),
            EntryWindow::Late => write!(f, "LATE (prices already reflect the day)"),
        }
    }
}
