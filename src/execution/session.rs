use crate::config::PositionSeed;
use crate::data::types::Bracket;
use crate::execution::types::{PositionMark, TrackedPosition};
use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

/// Positions the user is watching during one run. Owned by the caller and
/// passed where needed; never persisted.
#[derive(Debug, Default)]
pub struct SessionContext {
    positions: Vec<TrackedPosition>,
    next_id: u64,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seeds(seeds: &[PositionSeed], now: DateTime<Utc>) -> Result<Self> {
        let mut session = Self::new();
        for seed in seeds {
            session.open_position(&seed.ticker, seed.entry_price, seed.contracts, now)?;
        }
        Ok(session)
    }

    pub fn open_position(
        &mut self,
        ticker: &str,
        entry_price: f64,
        contracts: u32,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        if ticker.trim().is_empty() {
            anyhow::bail!("Position needs a market ticker");
        }
        if !(entry_price > 0.0 && entry_price < 100.0) {
            anyhow::bail!("Entry price must be between 0 and 100 cents, got {}", entry_price);
        }
        if contracts == 0 {
            anyhow::bail!("Position needs at least one contract");
        }

        self.next_id += 1;
        let id = self.next_id;
        self.positions.push(TrackedPosition {
            id,
            ticker: ticker.to_string(),
            entry_price,
            contracts,
            opened_at: now,
        });
        info!("Tracking {} x{} @ {:.0}¢ (#{})", ticker, contracts, entry_price, id);
        Ok(id)
    }

    pub fn close_position(&mut self, id: u64) -> Option<TrackedPosition> {
        let index = self.positions.iter().position(|p| p.id == id)?;
        let closed = self.positions.remove(index);
        info!("Stopped tracking {} (#{})", closed.ticker, id);
        Some(closed)
    }

    pub fn positions(&self) -> &[TrackedPosition] {
        &self.positions
    }

    /// Value every position at the current YES price of its bracket.
    pub fn mark_to_market(&self, brackets: &[Bracket]) -> Vec<PositionMark> {
        self.positions
            .iter()
            .map(|p| {
                let current_price = brackets.iter().find(|b| b.ticker == p.ticker).map(|b| b.yes_price);
                PositionMark {
                    position: p.clone(),
                    current_price,
                    unrealized_pnl: current_price.map(|price| (price - p.entry_price) * p.contracts as f64),
                }
            })
            .collect()
    }
}
