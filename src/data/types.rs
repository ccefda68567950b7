use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Which daily extreme a market settles on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForecastTarget {
    DailyHigh,
    DailyLow,
}

impl std::fmt::Display for ForecastTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForecastTarget::DailyHigh => write!(f, "HIGH"),
            ForecastTarget::DailyLow => write!(f, "LOW"),
        }
    }
}

/// One market record as it comes off the feed, before label parsing.
/// Prices are cents on a 0-100 scale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMarket {
    pub ticker: String,
    pub event_ticker: String,
    pub label: String,
    pub yes_bid: Option<f64>,
    pub yes_ask: Option<f64>,
    pub no_bid: Option<f64>,
    pub no_ask: Option<f64>,
    pub close_time: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenEnded {
    None,
    Below,
    Above,
}

/// One priced outcome slice of a market snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub ticker: String,
    pub raw_label: String,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    /// Representative value used for weighting. `None` only when the label
    /// could not be read and fallback midpoints are disabled.
    pub midpoint: Option<f64>,
    pub open_ended: OpenEnded,
    pub yes_price: f64,
    pub url: String,
}

impl Bracket {
    /// Whether an outcome value settles inside this bracket. Bracket edges
    /// are whole degrees, so a value is rounded before comparison.
    pub fn contains(&self, value: f64) -> bool {
        let settled = value.round();
        let above_lower = self.lower_bound.map_or(true, |lo| settled >= lo);
        let below_upper = self.upper_bound.map_or(true, |hi| settled <= hi);
        match (self.lower_bound, self.upper_bound) {
            (None, None) => false,
            _ => above_lower && below_upper,
        }
    }

    /// Display form of the parsed range.
    pub fn range_text(&self) -> String {
        match (self.open_ended, self.lower_bound, self.upper_bound) {
            (OpenEnded::Below, _, Some(hi)) => format!("{}° or below", hi),
            (OpenEnded::Above, Some(lo), _) => format!("{}° or above", lo),
            (_, Some(lo), Some(hi)) if lo == hi => format!("{}°", lo),
            (_, Some(lo), Some(hi)) => format!("{}° to {}°", lo, hi),
            _ => self.raw_label.clone(),
        }
    }
}

/// A single reading from an observation station, in °F and mph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSample {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub dew_point: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub cloud_cover_pct: Option<f64>,
    pub description: Option<String>,
}

impl ObservationSample {
    /// Fractional local hour of day, e.g. 9:30 → 9.5.
    pub fn hour_of_day(&self, tz: &Tz) -> f64 {
        local_hour(&self.timestamp, tz)
    }
}

pub fn local_hour(ts: &DateTime<Utc>, tz: &Tz) -> f64 {
    let local = ts.with_timezone(tz);
    local.hour() as f64 + local.minute() as f64 / 60.0 + local.second() as f64 / 3600.0
}

/// The official day/night forecast for the current day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OfficialForecast {
    pub high: Option<f64>,
    pub low: Option<f64>,
}

impl OfficialForecast {
    pub fn for_target(&self, target: ForecastTarget) -> Option<f64> {
        match target {
            ForecastTarget::DailyHigh => self.high,
            ForecastTarget::DailyLow => self.low,
        }
    }
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    ((c * 9.0 / 5.0 + 32.0) * 10.0).round() / 10.0
}

pub fn kmh_to_mph(kmh: f64) -> f64 {
    kmh / 1.609_344
}
