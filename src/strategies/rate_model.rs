//! Projects the afternoon high from the morning warming rate.

use crate::config::RateModelConfig;
use crate::data::types::{ForecastTarget, ObservationSample};
use crate::strategies::model::{observed_extreme, ForecastContext, ForecastModel};
use crate::strategies::types::{Confidence, ForecastEstimate, ForecastMethod, ModelOutcome};
use crate::strategies::volatility::{GateDecision, VolatilityGate};
use tracing::{debug, warn};

const MIN_SPAN_HOURS: f64 = 1e-6;

pub struct RateExtrapolationModel {
    config: RateModelConfig,
    gate: VolatilityGate,
}

impl RateExtrapolationModel {
    pub fn new(config: RateModelConfig, gate: VolatilityGate) -> Self {
        Self { config, gate }
    }

    /// Heating slows as the peak nears; the first tier whose minimum lead
    /// time is met applies.
    pub fn damping_factor(&self, hours_until_peak: f64) -> f64 {
        self.config
            .damping_tiers
            .iter()
            .find(|(min_hours, _)| hours_until_peak >= *min_hours)
            .map(|(_, factor)| *factor)
            .unwrap_or(self.config.damping_floor)
    }

    /// Readings inside the trusted morning window.
    fn trusted_window<'a>(
        &self,
        samples: &[&'a ObservationSample],
        ctx: &ForecastContext,
    ) -> Vec<&'a ObservationSample> {
        samples
            .iter()
            .copied()
            .filter(|s| {
                let hour = s.hour_of_day(&ctx.tz);
                hour >= self.config.trusted_window_start_hour && hour < self.config.trusted_window_end_hour
            })
            .collect()
    }
}

impl ForecastModel for RateExtrapolationModel {
    fn name(&self) -> &'static str {
        "rate"
    }

    fn estimate(&self, observations: &[ObservationSample], ctx: &ForecastContext) -> ModelOutcome {
        if ctx.target != ForecastTarget::DailyHigh {
            return ModelOutcome::insufficient("rate extrapolation only models the daily high");
        }

        let today = ctx.todays_samples(observations);
        let observed_max = today.iter().map(|s| s.temperature).reduce(f64::max);

        if ctx.local_hour() >= self.config.peak_hour {
            return match observed_max {
                Some(max) => observed_extreme(max, ctx.target),
                None => ModelOutcome::insufficient("no readings today"),
            };
        }

        let window = self.trusted_window(&today, ctx);
        if window.len() < self.config.min_samples {
            return ModelOutcome::insufficient(format!(
                "{} readings in trusted window, need {}",
                window.len(),
                self.config.min_samples
            ));
        }

        let values: Vec<f64> = window.iter().map(|s| s.temperature).collect();
        let diagnostics = match self.gate.evaluate(&values) {
            GateDecision::Pass(d) => d,
            GateDecision::Block { reason, diagnostics } => {
                warn!(
                    "Volatility gate blocked: {} (max reversal {:.2}°, zigzag {:.2})",
                    reason, diagnostics.max_reversal, diagnostics.zigzag_ratio
                );
                return ModelOutcome::Blocked { reason, diagnostics };
            }
        };

        let (first, last) = (window[0], window[window.len() - 1]);
        let first_hour = first.hour_of_day(&ctx.tz);
        let last_hour = last.hour_of_day(&ctx.tz);
        let span = last_hour - first_hour;

        let (rate, defaulted) = if span.abs() < MIN_SPAN_HOURS {
            (self.config.default_rate_per_hour, true)
        } else {
            ((last.temperature - first.temperature) / span, false)
        };

        let hours_until_peak = (self.config.peak_hour - last_hour).max(0.0);
        let damping = self.damping_factor(hours_until_peak);
        let remaining = rate * hours_until_peak * damping;
        let projected = last.temperature + remaining;
        let biased = projected + self.config.bias_correction;
        let value = observed_max.map_or(biased, |max| biased.max(max));

        let confidence = if defaulted {
            Confidence::Low
        } else if hours_until_peak <= 3.0 && diagnostics.reversal_count == 0 {
            Confidence::High
        } else {
            Confidence::Medium
        };

        debug!(
            "Rate model: {:.2}°/h, {:.1}h to peak, damping {:.1} → {:.1}°",
            rate, hours_until_peak, damping, value
        );

        let mut estimate = ForecastEstimate::new(value, confidence, ForecastMethod::RateExtrapolation)
            .with_band(value, value + self.config.band_width)
            .with_factor(format!(
                "{} readings {:.1}°→{:.1}° over {:.1}h",
                window.len(),
                first.temperature,
                last.temperature,
                span
            ))
            .with_factor(if defaulted {
                format!("rate {:.2}°/h (default, zero time span)", rate)
            } else {
                format!("rate {:.2}°/h", rate)
            })
            .with_factor(format!("{:.1}h to peak, damping {:.1}", hours_until_peak, damping))
            .with_factor(format!("projected {:.1}°, bias {:+.1}°", projected, self.config.bias_correction))
            .with_factor(format!(
                "gate passed: max reversal {:.2}°, zigzag {:.2}",
                diagnostics.max_reversal, diagnostics.zigzag_ratio
            ));
        if value > biased {
            estimate = estimate.with_factor(format!("raised to observed high {:.1}°", value));
        }

        ModelOutcome::Estimate(estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VolatilityConfig;
    use crate::strategies::types::BlockReason;
    use chrono::{TimeZone, Utc};

    fn model() -> RateExtrapolationModel {
        RateExtrapolationModel::new(
            RateModelConfig::default(),
            VolatilityGate::new(VolatilityConfig::default()),
        )
    }

    /// Reading at a New York local time in January (UTC-5).
    fn reading(hour: u32, minute: u32, temperature: f64) -> ObservationSample {
        ObservationSample {
            timestamp: Utc.with_ymd_and_hms(2025, 1, 15, hour + 5, minute, 0).unwrap(),
            temperature,
            dew_point: None,
            wind_speed: None,
            wind_direction: None,
            cloud_cover_pct: None,
            description: None,
        }
    }

    fn ctx_at(hour: u32, minute: u32, target: ForecastTarget) -> ForecastContext {
        ForecastContext {
            target,
            now: Utc.with_ymd_and_hms(2025, 1, 15, hour + 5, minute, 0).unwrap(),
            tz: chrono_tz::America::New_York,
            current: None,
        }
    }

    #[test]
    fn test_damping_tiers() {
        let m = model();
        assert_eq!(m.damping_factor(6.0), 0.8);
        assert_eq!(m.damping_factor(5.0), 0.8);
        assert_eq!(m.damping_factor(4.0), 0.6);
        assert_eq!(m.damping_factor(1.0), 0.5);
    }

    #[test]
    fn test_steady_morning_projection() {
        // 2°/h from 7:00 to 10:00, 5h to a 15:00 peak → damping 0.8
        let readings = vec![
            reading(7, 0, 30.0),
            reading(8, 0, 32.0),
            reading(9, 0, 34.0),
            reading(10, 0, 36.0),
        ];
        let outcome = model().estimate(&readings, &ctx_at(10, 30, ForecastTarget::DailyHigh));
        let e = outcome.estimate().unwrap();

        // 36 + 2 * 5 * 0.8 + 1 = 45
        assert!((e.value - 45.0).abs() < 1e-9);
        let band = e.band.unwrap();
        assert!((band.high - band.low - 1.0).abs() < 1e-9);
        assert_eq!(e.method, ForecastMethod::RateExtrapolation);
        assert!(!e.supporting_factors.is_empty());
    }

    #[test]
    fn test_insufficient_morning_data() {
        let readings = vec![reading(8, 0, 32.0)];
        let outcome = model().estimate(&readings, &ctx_at(9, 0, ForecastTarget::DailyHigh));
        assert!(matches!(outcome, ModelOutcome::InsufficientData { .. }));

        let outcome = model().estimate(&[], &ctx_at(9, 0, ForecastTarget::DailyHigh));
        assert!(matches!(outcome, ModelOutcome::InsufficientData { .. }));
    }

    #[test]
    fn test_readings_outside_window_do_not_count() {
        let readings = vec![
            reading(3, 0, 28.0),
            reading(4, 0, 28.5),
            reading(5, 0, 29.0),
            reading(7, 0, 30.0),
        ];
        let outcome = model().estimate(&readings, &ctx_at(7, 30, ForecastTarget::DailyHigh));
        assert!(matches!(outcome, ModelOutcome::InsufficientData { .. }));
    }

    #[test]
    fn test_volatility_block() {
        let readings = vec![
            reading(7, 0, 30.0),
            reading(8, 0, 32.0),
            reading(9, 0, 30.5),
            reading(10, 0, 33.0),
        ];
        let outcome = model().estimate(&readings, &ctx_at(10, 30, ForecastTarget::DailyHigh));
        match outcome {
            ModelOutcome::Blocked { reason, diagnostics } => {
                assert_eq!(reason, BlockReason::LargeReversal);
                assert_eq!(diagnostics.sample_count, 4);
                assert_eq!(diagnostics.max_reversal, 2.5);
            }
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_span_uses_default_rate() {
        let readings = vec![reading(8, 0, 30.0), reading(8, 0, 30.0), reading(8, 0, 31.0)];
        let outcome = model().estimate(&readings, &ctx_at(9, 0, ForecastTarget::DailyHigh));
        let e = outcome.estimate().unwrap();

        // 31 + 1.5 * 7 * 0.8 + 1
        assert!((e.value - (31.0 + 1.5 * 7.0 * 0.8 + 1.0)).abs() < 1e-9);
        assert_eq!(e.confidence, Confidence::Low);
        assert!(e.value.is_finite());
    }

    #[test]
    fn test_after_peak_reports_observed_high() {
        let readings = vec![
            reading(9, 0, 34.0),
            reading(13, 0, 44.0),
            reading(15, 0, 46.0),
            reading(16, 0, 45.0),
        ];
        let outcome = model().estimate(&readings, &ctx_at(16, 30, ForecastTarget::DailyHigh));
        let e = outcome.estimate().unwrap();

        assert_eq!(e.value, 46.0);
        assert_eq!(e.confidence, Confidence::High);
        assert_eq!(e.method, ForecastMethod::ObservedExtreme);
    }

    #[test]
    fn test_low_target_not_modeled() {
        let outcome = model().estimate(&[], &ctx_at(5, 0, ForecastTarget::DailyLow));
        assert!(matches!(outcome, ModelOutcome::InsufficientData { .. }));
    }
}
