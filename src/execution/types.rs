use chrono::{DateTime, Utc};

/// A YES position the user is tracking for this session. Prices in cents.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedPosition {
    pub id: u64,
    pub ticker: String,
    pub entry_price: f64,
    pub contracts: u32,
    pub opened_at: DateTime<Utc>,
}

impl TrackedPosition {
    pub fn cost(&self) -> f64 {
        self.entry_price * self.contracts as f64
    }
}

/// A position valued against the latest snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionMark {
    pub position: TrackedPosition,
    /// `None` when the ticker is not in the snapshot (settled or other day).
    pub current_price: Option<f64>,
    pub unrealized_pnl: Option<f64>,
}
