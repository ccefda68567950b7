//! Heating/cooling potential from current conditions, bounded by a seasonal
//! ceiling above and the dew point below.

use crate::config::PhysicalModelConfig;
use crate::data::types::{ForecastTarget, ObservationSample};
use crate::strategies::model::{observed_extreme, ForecastContext, ForecastModel};
use crate::strategies::types::{Confidence, ForecastEstimate, ForecastMethod, ModelOutcome};
use tracing::debug;

pub struct BoundedPhysicalModel {
    config: PhysicalModelConfig,
}

/// `max(projected, floor)`. Air rarely cools far below its dew point, so the
/// floor wins whenever the projection falls under it.
pub fn apply_dew_point_floor(projected: f64, floor: Option<f64>) -> f64 {
    match floor {
        Some(f) => projected.max(f),
        None => projected,
    }
}

/// Low-temperature forecast: `max(current − cooling, floor)`.
pub fn low_forecast(current: f64, cooling_potential: f64, floor: Option<f64>) -> f64 {
    apply_dew_point_floor(current - cooling_potential, floor)
}

impl BoundedPhysicalModel {
    pub fn new(config: PhysicalModelConfig) -> Self {
        Self { config }
    }

    /// Warming rate (°/h) for the local hour: strongest in the morning.
    pub fn base_rate(&self, hour: f64) -> f64 {
        if hour < 10.0 {
            self.config.morning_rate
        } else if hour < 13.0 {
            self.config.midday_rate
        } else {
            self.config.afternoon_rate
        }
    }

    /// Factor in [0, 1]; unknown cover leaves the rate untouched.
    pub fn cloud_damping(&self, cloud_cover_pct: Option<f64>, strength: f64) -> f64 {
        let cover = cloud_cover_pct.unwrap_or(0.0).clamp(0.0, 100.0) / 100.0;
        (1.0 - strength * cover).clamp(0.0, 1.0)
    }

    /// Factor in [0, 1]; wind above the saturation speed has no extra effect.
    pub fn wind_damping(&self, wind_mph: Option<f64>, strength: f64) -> f64 {
        let saturation = self.config.wind_saturation_mph.max(f64::EPSILON);
        let share = (wind_mph.unwrap_or(0.0).max(0.0) / saturation).min(1.0);
        (1.0 - strength * share).clamp(0.0, 1.0)
    }

    pub fn seasonal_ceiling(&self, month: u32) -> f64 {
        match month {
            12 | 1 | 2 => self.config.winter_ceiling,
            6..=8 => self.config.summer_ceiling,
            _ => self.config.shoulder_ceiling,
        }
    }

    pub fn heating_potential(&self, sample: &ObservationSample, hour: f64, month: u32) -> f64 {
        let hours_until_peak = (self.config.peak_hour - hour).max(0.0);
        let raw = hours_until_peak
            * self.base_rate(hour)
            * self.cloud_damping(sample.cloud_cover_pct, self.config.cloud_heating_damping)
            * self.wind_damping(sample.wind_speed, self.config.wind_heating_damping);
        raw.min(self.seasonal_ceiling(month))
    }

    /// Overnight cooling still to come before sunrise. Clouds trap heat and
    /// wind keeps the surface layer mixed, so both reduce it.
    pub fn cooling_potential(&self, sample: &ObservationSample, hour: f64) -> f64 {
        let hours_until_sunrise = (self.config.sunrise_hour - hour).max(0.0);
        let raw = hours_until_sunrise
            * self.config.cooling_rate
            * self.cloud_damping(sample.cloud_cover_pct, self.config.cloud_cooling_damping)
            * self.wind_damping(sample.wind_speed, self.config.wind_cooling_damping);
        raw.min(self.config.cooling_ceiling)
    }

    pub fn dew_point_floor(&self, dew_point: Option<f64>) -> Option<f64> {
        dew_point.map(|d| d - self.config.dew_point_offset)
    }

    fn confidence(sample: &ObservationSample) -> Confidence {
        if sample.cloud_cover_pct.is_some() && sample.wind_speed.is_some() {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    fn estimate_high(&self, observations: &[ObservationSample], ctx: &ForecastContext) -> ModelOutcome {
        let hour = ctx.local_hour();
        let observed_max = ctx.observed_max(observations);

        if hour >= self.config.peak_end_hour {
            return match observed_max {
                Some(max) => observed_extreme(max, ctx.target),
                None => ModelOutcome::insufficient("no readings today"),
            };
        }

        let current = match ctx.current_reading(observations) {
            Some(c) => c,
            None => return ModelOutcome::insufficient("no current reading"),
        };

        let month = ctx.month();
        let heating = self.heating_potential(current, hour, month);
        let projected = current.temperature + heating;
        let value = observed_max.map_or(projected, |max| projected.max(max));

        debug!(
            "Physical high: {:.1}° + {:.1}° heating → {:.1}°",
            current.temperature, heating, value
        );

        let mut estimate = ForecastEstimate::new(value, Self::confidence(current), ForecastMethod::PhysicalHeating)
            .with_factor(format!("current {:.1}°", current.temperature))
            .with_factor(format!(
                "base rate {:.1}°/h, {:.1}h to peak",
                self.base_rate(hour),
                (self.config.peak_hour - hour).max(0.0)
            ))
            .with_factor(format!(
                "cloud x{:.2}, wind x{:.2}",
                self.cloud_damping(current.cloud_cover_pct, self.config.cloud_heating_damping),
                self.wind_damping(current.wind_speed, self.config.wind_heating_damping)
            ))
            .with_factor(format!(
                "heating {:.1}° (ceiling {:.0}°)",
                heating,
                self.seasonal_ceiling(month)
            ));
        if value > projected {
            estimate = estimate.with_factor(format!("raised to observed high {:.1}°", value));
        }
        ModelOutcome::Estimate(estimate)
    }

    fn estimate_low(&self, observations: &[ObservationSample], ctx: &ForecastContext) -> ModelOutcome {
        let hour = ctx.local_hour();
        let observed_min = ctx.observed_min(observations);

        if hour >= self.config.low_window_end_hour {
            return match observed_min {
                Some(min) => observed_extreme(min, ctx.target),
                None => ModelOutcome::insufficient("no readings today"),
            };
        }

        let current = match ctx.current_reading(observations) {
            Some(c) => c,
            None => return ModelOutcome::insufficient("no current reading"),
        };

        let cooling = self.cooling_potential(current, hour);
        let floor = self.dew_point_floor(current.dew_point);
        let projected = current.temperature - cooling;
        let floored = apply_dew_point_floor(projected, floor);
        // a low already recorded today cannot be undone
        let value = observed_min.map_or(floored, |min| floored.min(min));

        debug!(
            "Physical low: {:.1}° − {:.1}° cooling, floor {:?} → {:.1}°",
            current.temperature, cooling, floor, value
        );

        let mut estimate = ForecastEstimate::new(value, Self::confidence(current), ForecastMethod::PhysicalCooling)
            .with_factor(format!("current {:.1}°", current.temperature))
            .with_factor(format!(
                "cooling {:.1}° over {:.1}h to sunrise",
                cooling,
                (self.config.sunrise_hour - hour).max(0.0)
            ));
        estimate = match floor {
            Some(f) if f > projected => estimate.with_factor(format!(
                "dew point floor {:.1}° binds (projection {:.1}°)",
                f, projected
            )),
            Some(f) => estimate.with_factor(format!("dew point floor {:.1}°", f)),
            None => estimate.with_factor("no dew point, floor not applied"),
        };
        if value < floored {
            estimate = estimate.with_factor(format!("already down to {:.1}° today", value));
        }
        ModelOutcome::Estimate(estimate)
    }
}

impl ForecastModel for BoundedPhysicalModel {
    fn name(&self) -> &'static str {
        "physical"
    }

    fn estimate(&self, observations: &[ObservationSample], ctx: &ForecastContext) -> ModelOutcome {
        match ctx.target {
            ForecastTarget::DailyHigh => self.estimate_high(observations, ctx),
            ForecastTarget::DailyLow => self.estimate_low(observations, ctx),
        }
    }
}
