use crate::config::{Config, ModelSelection};
use crate::data::types::{ForecastTarget, ObservationSample};
use crate::strategies::physical_model::BoundedPhysicalModel;
use crate::strategies::rate_model::RateExtrapolationModel;
use crate::strategies::types::{Confidence, ForecastEstimate, ForecastMethod, ModelOutcome};
use crate::strategies::volatility::VolatilityGate;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;

/// Everything a model needs besides the readings themselves.
#[derive(Debug, Clone)]
pub struct ForecastContext {
    pub target: ForecastTarget,
    pub now: DateTime<Utc>,
    pub tz: Tz,
    /// Latest reading, which may be newer than the history window.
    pub current: Option<ObservationSample>,
}

impl ForecastContext {
    pub fn local_hour(&self) -> f64 {
        crate::data::types::local_hour(&self.now, &self.tz)
    }

    pub fn local_date(&self) -> NaiveDate {
        self.now.with_timezone(&self.tz).date_naive()
    }

    pub fn month(&self) -> u32 {
        self.now.with_timezone(&self.tz).month()
    }

    /// Readings taken today (local time) up to now, oldest first, with the
    /// current reading appended when it is newer than the history.
    pub fn todays_samples<'a>(&'a self, observations: &'a [ObservationSample]) -> Vec<&'a ObservationSample> {
        let today = self.local_date();
        let mut samples: Vec<&ObservationSample> = observations
            .iter()
            .filter(|s| s.timestamp <= self.now)
            .filter(|s| s.timestamp.with_timezone(&self.tz).date_naive() == today)
            .collect();

        if let Some(current) = &self.current {
            let newer = samples.last().map_or(true, |last| current.timestamp > last.timestamp);
            let is_today = current.timestamp.with_timezone(&self.tz).date_naive() == today;
            if newer && is_today {
                samples.push(current);
            }
        }
        samples
    }

    /// Most recent reading from either the latest-observation endpoint or the
    /// history.
    pub fn current_reading<'a>(&'a self, observations: &'a [ObservationSample]) -> Option<&'a ObservationSample> {
        match (&self.current, observations.last()) {
            (Some(c), Some(last)) if last.timestamp > c.timestamp => Some(last),
            (Some(c), _) => Some(c),
            (None, last) => last,
        }
    }

    pub fn observed_max(&self, observations: &[ObservationSample]) -> Option<f64> {
        self.todays_samples(observations)
            .iter()
            .map(|s| s.temperature)
            .reduce(f64::max)
    }

    pub fn observed_min(&self, observations: &[ObservationSample]) -> Option<f64> {
        self.todays_samples(observations)
            .iter()
            .map(|s| s.temperature)
            .reduce(f64::min)
    }
}

/// An independent forecast strategy. Implementations are pure functions of
/// their inputs.
pub trait ForecastModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn estimate(&self, observations: &[ObservationSample], ctx: &ForecastContext) -> ModelOutcome;
}

/// The extreme has already happened; report it instead of extrapolating.
pub fn observed_extreme(value: f64, target: ForecastTarget) -> ModelOutcome {
    let label = match target {
        ForecastTarget::DailyHigh => "high",
        ForecastTarget::DailyLow => "low",
    };
    ModelOutcome::Estimate(
        ForecastEstimate::new(value, Confidence::High, ForecastMethod::ObservedExtreme)
            .with_factor(format!("window passed, observed {} so far {:.1}°", label, value)),
    )
}

/// Runs members in order and averages their estimates. A blocked member
/// stops the run: the whole forecast is blocked for the day.
pub struct EnsembleModel {
    members: Vec<Box<dyn ForecastModel>>,
}

impl EnsembleModel {
    pub fn new(members: Vec<Box<dyn ForecastModel>>) -> Self {
        Self { members }
    }
}

impl ForecastModel for EnsembleModel {
    fn name(&self) -> &'static str {
        "ensemble"
    }

    fn estimate(&self, observations: &[ObservationSample], ctx: &ForecastContext) -> ModelOutcome {
        let mut estimates: Vec<(&'static str, ForecastEstimate)> = Vec::new();
        let mut gaps: Vec<String> = Vec::new();

        for member in &self.members {
            match member.estimate(observations, ctx) {
                ModelOutcome::Estimate(e) => estimates.push((member.name(), e)),
                ModelOutcome::InsufficientData { reason } => {
                    gaps.push(format!("{}: {}", member.name(), reason));
                }
                blocked @ ModelOutcome::Blocked { .. } => return blocked,
            }
        }

        match estimates.len() {
            0 => ModelOutcome::insufficient(gaps.join("; ")),
            1 => {
                let (_, only) = estimates.remove(0);
                ModelOutcome::Estimate(only)
            }
            n => {
                let mean = estimates.iter().map(|(_, e)| e.value).sum::<f64>() / n as f64;
                let low = estimates.iter().map(|(_, e)| e.value).fold(f64::INFINITY, f64::min);
                let high = estimates.iter().map(|(_, e)| e.value).fold(f64::NEG_INFINITY, f64::max);
                let confidence = estimates
                    .iter()
                    .map(|(_, e)| e.confidence)
                    .min()
                    .unwrap_or(Confidence::Low);

                let mut merged = ForecastEstimate::new(mean, confidence, ForecastMethod::Ensemble)
                    .with_band(low, high);
                for (name, e) in &estimates {
                    merged = merged.with_factor(format!("{} → {:.1}°", name, e.value));
                    for factor in &e.supporting_factors {
                        merged = merged.with_factor(format!("  {}: {}", name, factor));
                    }
                }
                ModelOutcome::Estimate(merged)
            }
        }
    }
}

pub fn build_model(config: &Config) -> Box<dyn ForecastModel> {
    let rate = || {
        Box::new(RateExtrapolationModel::new(
            config.rate_model.clone(),
            VolatilityGate::new(config.volatility.clone()),
        )) as Box<dyn ForecastModel>
    };
    let physical = || Box::new(BoundedPhysicalModel::new(config.physical_model.clone())) as Box<dyn ForecastModel>;

    match config.edge.model {
        ModelSelection::Rate => rate(),
        ModelSelection::Physical => physical(),
        ModelSelection::Ensemble => Box::new(EnsembleModel::new(vec![rate(), physical()])),
    }
}
