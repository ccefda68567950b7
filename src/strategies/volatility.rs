//! Pre-check that refuses to extrapolate a trend from readings that swing
//! back and forth.

use crate::config::VolatilityConfig;
use crate::strategies::types::{BlockReason, GateDiagnostics};

const FLAT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Pass(GateDiagnostics),
    Block {
        reason: BlockReason,
        diagnostics: GateDiagnostics,
    },
}

impl GateDecision {
    pub fn diagnostics(&self) -> &GateDiagnostics {
        match self {
            GateDecision::Pass(d) => d,
            GateDecision::Block { diagnostics, .. } => diagnostics,
        }
    }
}

/// Compute reversal statistics for a sequence of readings.
///
/// A reversal is a pair of consecutive deltas with opposite sign where both
/// exceed the deadband; its magnitude is the size of the reversing delta.
pub fn gate_diagnostics(values: &[f64], deadband: f64) -> GateDiagnostics {
    let net_move = match (values.first(), values.last()) {
        (Some(first), Some(last)) => last - first,
        _ => 0.0,
    };

    let deltas: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let reversals: Vec<f64> = deltas
        .windows(2)
        .filter(|d| d[0] * d[1] < 0.0 && d[0].abs() > deadband && d[1].abs() > deadband)
        .map(|d| d[1].abs())
        .collect();

    let max_reversal = reversals.iter().cloned().fold(0.0, f64::max);
    let reversal_sum: f64 = reversals.iter().sum();
    let zigzag_ratio = if net_move.abs() < FLAT_EPSILON {
        0.0
    } else {
        reversal_sum / net_move.abs()
    };

    GateDiagnostics {
        sample_count: values.len(),
        net_move,
        reversal_count: reversals.len(),
        max_reversal,
        zigzag_ratio,
    }
}

pub struct VolatilityGate {
    config: VolatilityConfig,
}

impl VolatilityGate {
    pub fn new(config: VolatilityConfig) -> Self {
        Self { config }
    }

    /// Checks run in a fixed order: flat window, largest reversal, then
    /// zigzag ratio.
    pub fn evaluate(&self, values: &[f64]) -> GateDecision {
        let diagnostics = gate_diagnostics(values, self.config.jitter_deadband);

        let reason = if diagnostics.net_move.abs() < FLAT_EPSILON {
            Some(BlockReason::NoTrend)
        } else if diagnostics.max_reversal > self.config.max_reversal {
            Some(BlockReason::LargeReversal)
        } else if diagnostics.zigzag_ratio > self.config.max_zigzag_ratio {
            Some(BlockReason::ErraticMovement)
        } else {
            None
        };

        match reason {
            Some(reason) => GateDecision::Block { reason, diagnostics },
            None => GateDecision::Pass(diagnostics),
        }
    }
}
