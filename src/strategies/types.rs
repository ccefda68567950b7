use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Low => write!(f, "LOW"),
            Confidence::Medium => write!(f, "MEDIUM"),
            Confidence::High => write!(f, "HIGH"),
        }
    }
}

/// Which path produced an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ForecastMethod {
    MarketImplied,
    OfficialForecast,
    RateExtrapolation,
    PhysicalHeating,
    PhysicalCooling,
    /// The extreme already happened today; value is the observed one.
    ObservedExtreme,
    Ensemble,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueBand {
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastEstimate {
    pub value: f64,
    pub confidence: Confidence,
    pub method: ForecastMethod,
    /// Uncertainty band when the method reports one.
    pub band: Option<ValueBand>,
    /// Intermediate terms, in the order they were computed.
    pub supporting_factors: Vec<String>,
}

impl ForecastEstimate {
    pub fn new(value: f64, confidence: Confidence, method: ForecastMethod) -> Self {
        Self {
            value,
            confidence,
            method,
            band: None,
            supporting_factors: Vec::new(),
        }
    }

    pub fn with_band(mut self, low: f64, high: f64) -> Self {
        self.band = Some(ValueBand { low, high });
        self
    }

    pub fn with_factor(mut self, factor: impl Into<String>) -> Self {
        self.supporting_factors.push(factor.into());
        self
    }

    /// The official forecast treated as an estimate.
    pub fn official(value: f64) -> Self {
        Self::new(value, Confidence::Medium, ForecastMethod::OfficialForecast)
            .with_factor(format!("official forecast {:.0}°", value))
    }
}

/// Diagnostics behind a volatility gate decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateDiagnostics {
    pub sample_count: usize,
    pub net_move: f64,
    pub reversal_count: usize,
    pub max_reversal: f64,
    pub zigzag_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockReason {
    NoTrend,
    LargeReversal,
    ErraticMovement,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::NoTrend => write!(f, "no trend"),
            BlockReason::LargeReversal => write!(f, "large reversal"),
            BlockReason::ErraticMovement => write!(f, "erratic movement"),
        }
    }
}

/// Result of one independent forecast model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ModelOutcome {
    Estimate(ForecastEstimate),
    /// Not enough input to say anything yet.
    InsufficientData { reason: String },
    /// Readings too erratic to trust: no trade today.
    Blocked {
        reason: BlockReason,
        diagnostics: GateDiagnostics,
    },
}

impl ModelOutcome {
    pub fn insufficient(reason: impl Into<String>) -> Self {
        ModelOutcome::InsufficientData {
            reason: reason.into(),
        }
    }

    pub fn estimate(&self) -> Option<&ForecastEstimate> {
        match self {
            ModelOutcome::Estimate(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, ModelOutcome::Blocked { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Recommendation {
    /// Independent forecast is above the comparator: favour higher brackets.
    FavorHigher,
    FavorLower,
    NoEdge,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::FavorHigher => write!(f, "FAVOR HIGHER"),
            Recommendation::FavorLower => write!(f, "FAVOR LOWER"),
            Recommendation::NoEdge => write!(f, "NO EDGE"),
        }
    }
}

/// What the independent forecast was compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Comparator {
    Market,
    Reference,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeResult {
    /// independent − comparator
    pub gap: f64,
    pub recommendation: Recommendation,
    pub confidence_tier: Confidence,
    pub comparator: Comparator,
    pub independent: f64,
    pub comparator_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ScoreTier {
    Skip,
    Lean,
    Good,
    Strong,
}

impl fmt::Display for ScoreTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreTier::Skip => write!(f, "SKIP"),
            ScoreTier::Lean => write!(f, "LEAN"),
            ScoreTier::Good => write!(f, "GOOD"),
            ScoreTier::Strong => write!(f, "STRONG"),
        }
    }
}
