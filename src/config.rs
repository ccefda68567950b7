use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub volatility: VolatilityConfig,
    #[serde(default)]
    pub rate_model: RateModelConfig,
    #[serde(default)]
    pub physical_model: PhysicalModelConfig,
    #[serde(default)]
    pub edge: EdgeConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    pub cities: Vec<CityConfig>,
    #[serde(default)]
    pub positions: Vec<PositionSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_poll_interval")]
    pub polling_interval_secs: u64,
    #[serde(default)]
    pub run_once: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            polling_interval_secs: default_poll_interval(),
            run_once: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InfrastructureConfig {
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_jitter")]
    pub retry_jitter_ms: u64,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_forecast_secs: u64,
    #[serde(default = "default_history_limit")]
    pub observation_history_limit: usize,
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_backoff_base(),
            retry_jitter_ms: default_jitter(),
            cache_ttl_forecast_secs: default_cache_ttl(),
            observation_history_limit: default_history_limit(),
        }
    }
}

/// Bracket label parsing. Fallback midpoints are historical defaults for
/// Fahrenheit markets; with `use_fallback_midpoints = false` brackets whose
/// numbers cannot be read are left unresolved instead.
#[derive(Debug, Clone, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default = "default_open_margin")]
    pub open_ended_margin: f64,
    #[serde(default = "default_true")]
    pub use_fallback_midpoints: bool,
    #[serde(default = "default_fallback_below")]
    pub fallback_below_midpoint: f64,
    #[serde(default = "default_fallback_above")]
    pub fallback_above_midpoint: f64,
    #[serde(default = "default_fallback_unparsed")]
    pub fallback_unparsed_midpoint: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            open_ended_margin: default_open_margin(),
            use_fallback_midpoints: true,
            fallback_below_midpoint: default_fallback_below(),
            fallback_above_midpoint: default_fallback_above(),
            fallback_unparsed_midpoint: default_fallback_unparsed(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolatilityConfig {
    /// Deltas at or below this size are treated as sensor noise.
    #[serde(default = "default_deadband")]
    pub jitter_deadband: f64,
    #[serde(default = "default_max_reversal")]
    pub max_reversal: f64,
    #[serde(default = "default_max_zigzag")]
    pub max_zigzag_ratio: f64,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            jitter_deadband: default_deadband(),
            max_reversal: default_max_reversal(),
            max_zigzag_ratio: default_max_zigzag(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateModelConfig {
    #[serde(default = "default_window_start")]
    pub trusted_window_start_hour: f64,
    #[serde(default = "default_window_end")]
    pub trusted_window_end_hour: f64,
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    #[serde(default = "default_rate")]
    pub default_rate_per_hour: f64,
    #[serde(default = "default_peak_hour")]
    pub peak_hour: f64,
    /// (minimum hours before peak, damping factor), checked in order.
    #[serde(default = "default_damping_tiers")]
    pub damping_tiers: Vec<(f64, f64)>,
    #[serde(default = "default_damping_floor")]
    pub damping_floor: f64,
    #[serde(default = "default_bias")]
    pub bias_correction: f64,
    #[serde(default = "default_band")]
    pub band_width: f64,
}

impl Default for RateModelConfig {
    fn default() -> Self {
        Self {
            trusted_window_start_hour: default_window_start(),
            trusted_window_end_hour: default_window_end(),
            min_samples: default_min_samples(),
            default_rate_per_hour: default_rate(),
            peak_hour: default_peak_hour(),
            damping_tiers: default_damping_tiers(),
            damping_floor: default_damping_floor(),
            bias_correction: default_bias(),
            band_width: default_band(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhysicalModelConfig {
    /// Hour after which the daily high is considered already set.
    #[serde(default = "default_peak_end")]
    pub peak_end_hour: f64,
    #[serde(default = "default_peak_hour")]
    pub peak_hour: f64,
    #[serde(default = "default_morning_rate")]
    pub morning_rate: f64,
    #[serde(default = "default_midday_rate")]
    pub midday_rate: f64,
    #[serde(default = "default_afternoon_rate")]
    pub afternoon_rate: f64,
    #[serde(default = "default_cooling_rate")]
    pub cooling_rate: f64,
    /// Fraction of the base rate removed under full overcast.
    #[serde(default = "default_cloud_heating")]
    pub cloud_heating_damping: f64,
    #[serde(default = "default_cloud_cooling")]
    pub cloud_cooling_damping: f64,
    #[serde(default = "default_wind_heating")]
    pub wind_heating_damping: f64,
    #[serde(default = "default_wind_cooling")]
    pub wind_cooling_damping: f64,
    #[serde(default = "default_wind_saturation")]
    pub wind_saturation_mph: f64,
    #[serde(default = "default_winter_ceiling")]
    pub winter_ceiling: f64,
    #[serde(default = "default_shoulder_ceiling")]
    pub shoulder_ceiling: f64,
    #[serde(default = "default_summer_ceiling")]
    pub summer_ceiling: f64,
    #[serde(default = "default_cooling_ceiling")]
    pub cooling_ceiling: f64,
    #[serde(default = "default_dew_offset")]
    pub dew_point_offset: f64,
    #[serde(default = "default_sunrise_hour")]
    pub sunrise_hour: f64,
    /// Hour after which the daily low is considered already set.
    #[serde(default = "default_low_window_end")]
    pub low_window_end_hour: f64,
}

impl Default for PhysicalModelConfig {
    fn default() -> Self {
        Self {
            peak_end_hour: default_peak_end(),
            peak_hour: default_peak_hour(),
            morning_rate: default_morning_rate(),
            midday_rate: default_midday_rate(),
            afternoon_rate: default_afternoon_rate(),
            cooling_rate: default_cooling_rate(),
            cloud_heating_damping: default_cloud_heating(),
            cloud_cooling_damping: default_cloud_cooling(),
            wind_heating_damping: default_wind_heating(),
            wind_cooling_damping: default_wind_cooling(),
            wind_saturation_mph: default_wind_saturation(),
            winter_ceiling: default_winter_ceiling(),
            shoulder_ceiling: default_shoulder_ceiling(),
            summer_ceiling: default_summer_ceiling(),
            cooling_ceiling: default_cooling_ceiling(),
            dew_point_offset: default_dew_offset(),
            sunrise_hour: default_sunrise_hour(),
            low_window_end_hour: default_low_window_end(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSelection {
    Rate,
    Physical,
    Ensemble,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EdgeConfig {
    #[serde(default = "default_strong")]
    pub strong_threshold: f64,
    #[serde(default = "default_weak")]
    pub weak_threshold: f64,
    #[serde(default = "default_strong_score")]
    pub strong_score: i32,
    #[serde(default = "default_good_score")]
    pub good_score: i32,
    #[serde(default = "default_lean_score")]
    pub lean_score: i32,
    /// Favourite bracket is not recommended above this price (cents).
    #[serde(default = "default_max_entry")]
    pub max_entry_price: f64,
    /// Use the official forecast as the independent value when no model
    /// produced one. Off by default: a model with no result skips the edge.
    #[serde(default)]
    pub reference_as_independent: bool,
    #[serde(default = "default_model")]
    pub model: ModelSelection,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            strong_threshold: default_strong(),
            weak_threshold: default_weak(),
            strong_score: default_strong_score(),
            good_score: default_good_score(),
            lean_score: default_lean_score(),
            max_entry_price: default_max_entry(),
            reference_as_independent: false,
            model: default_model(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub csv_logging: bool,
    #[serde(default = "default_csv_path")]
    pub csv_log_path: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            csv_logging: false,
            csv_log_path: default_csv_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridPoint {
    pub office: String,
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CityConfig {
    pub key: String,
    pub name: String,
    pub timezone: String,
    pub high_series: String,
    pub low_series: String,
    /// Observation stations in priority order.
    pub stations: Vec<String>,
    pub grid: GridPoint,
}

impl CityConfig {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Invalid timezone for {}: {}", self.key, e))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionSeed {
    pub ticker: String,
    pub entry_price: f64,
    pub contracts: u32,
}

fn default_poll_interval() -> u64 { 300 }
fn default_timeout() -> u64 { 10 }
fn default_max_retries() -> u32 { 2 }
fn default_backoff_base() -> u64 { 250 }
fn default_jitter() -> u64 { 250 }
fn default_cache_ttl() -> u64 { 900 }
fn default_history_limit() -> usize { 24 }
fn default_open_margin() -> f64 { 2.5 }
fn default_fallback_below() -> f64 { 30.0 }
fn default_fallback_above() -> f64 { 60.0 }
fn default_fallback_unparsed() -> f64 { 42.5 }
fn default_deadband() -> f64 { 0.3 }
fn default_max_reversal() -> f64 { 1.2 }
fn default_max_zigzag() -> f64 { 0.45 }
fn default_window_start() -> f64 { 6.0 }
fn default_window_end() -> f64 { 11.0 }
fn default_min_samples() -> usize { 3 }
fn default_rate() -> f64 { 1.5 }
fn default_peak_hour() -> f64 { 15.0 }
fn default_damping_tiers() -> Vec<(f64, f64)> { vec![(5.0, 0.8), (3.0, 0.6)] }
fn default_damping_floor() -> f64 { 0.5 }
fn default_bias() -> f64 { 1.0 }
fn default_band() -> f64 { 1.0 }
fn default_peak_end() -> f64 { 17.0 }
fn default_morning_rate() -> f64 { 2.0 }
fn default_midday_rate() -> f64 { 1.5 }
fn default_afternoon_rate() -> f64 { 0.8 }
fn default_cooling_rate() -> f64 { 1.2 }
fn default_cloud_heating() -> f64 { 0.6 }
fn default_cloud_cooling() -> f64 { 0.7 }
fn default_wind_heating() -> f64 { 0.3 }
fn default_wind_cooling() -> f64 { 0.4 }
fn default_wind_saturation() -> f64 { 25.0 }
fn default_winter_ceiling() -> f64 { 12.0 }
fn default_shoulder_ceiling() -> f64 { 16.0 }
fn default_summer_ceiling() -> f64 { 20.0 }
fn default_cooling_ceiling() -> f64 { 15.0 }
fn default_dew_offset() -> f64 { 2.0 }
fn default_sunrise_hour() -> f64 { 6.5 }
fn default_low_window_end() -> f64 { 9.0 }
fn default_strong() -> f64 { 2.0 }
fn default_weak() -> f64 { 1.0 }
fn default_strong_score() -> i32 { 8 }
fn default_good_score() -> i32 { 6 }
fn default_lean_score() -> i32 { 4 }
fn default_max_entry() -> f64 { 85.0 }
fn default_true() -> bool { true }
fn default_model() -> ModelSelection { ModelSelection::Ensemble }
fn default_csv_path() -> String { "edge_log.csv".to_string() }

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub kalshi_api_url: String,
    pub nws_api_url: String,
    pub nws_user_agent: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.infrastructure.request_timeout_secs == 0
            || self.infrastructure.request_timeout_secs > 15
        {
            anyhow::bail!(
                "request_timeout_secs must be within 1..=15, got {}",
                self.infrastructure.request_timeout_secs
            );
        }
        if self.edge.weak_threshold > self.edge.strong_threshold {
            anyhow::bail!("edge.weak_threshold must not exceed edge.strong_threshold");
        }
        if self.rate_model.min_samples < 2 {
            anyhow::bail!("rate_model.min_samples must be at least 2");
        }
        for city in &self.cities {
            city.tz()?;
            if city.stations.is_empty() {
                anyhow::bail!("City {} has no observation stations", city.key);
            }
        }
        Ok(())
    }
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            kalshi_api_url: std::env::var("KALSHI_API_URL")
                .unwrap_or_else(|_| "https://api.elections.kalshi.com/trade-api/v2".to_string()),
            nws_api_url: std::env::var("NWS_API_URL")
                .unwrap_or_else(|_| "https://api.weather.gov".to_string()),
            nws_user_agent: std::env::var("NWS_USER_AGENT")
                .unwrap_or_else(|_| "TempEdgeFinder/4.0".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [[cities]]
        key = "NYC"
        name = "New York (Central Park)"
        timezone = "America/New_York"
        high_series = "KXHIGHNY"
        low_series = "KXLOWTNYC"
        stations = ["KNYC", "KLGA"]
        grid = { office = "OKX", x = 33, y = 37 }
    "#;

    #[test]
    fn test_sparse_config_uses_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();

        assert_eq!(config.cities.len(), 1);
        assert_eq!(config.normalizer.open_ended_margin, 2.5);
        assert_eq!(config.normalizer.fallback_above_midpoint, 60.0);
        assert!(config.normalizer.use_fallback_midpoints);
        assert_eq!(config.volatility.max_reversal, 1.2);
        assert_eq!(config.volatility.max_zigzag_ratio, 0.45);
        assert_eq!(config.edge.strong_threshold, 2.0);
        assert_eq!(config.edge.model, ModelSelection::Ensemble);
        assert_eq!(config.infrastructure.request_timeout_secs, 10);
        assert!(config.positions.is_empty());
    }

    #[test]
    fn test_rejects_unknown_timezone() {
        let bad = MINIMAL.replace("America/New_York", "Mars/Olympus_Mons");
        assert!(Config::from_toml(&bad).is_err());
    }

    #[test]
    fn test_rejects_long_timeout() {
        let bad = format!("[infrastructure]\nrequest_timeout_secs = 60\n{}", MINIMAL);
        assert!(Config::from_toml(&bad).is_err());
    }

    #[test]
    fn test_model_selection_parses() {
        let text = format!("[edge]\nmodel = \"rate\"\n{}", MINIMAL);
        let config = Config::from_toml(&text).unwrap();
        assert_eq!(config.edge.model, ModelSelection::Rate);
    }

    #[test]
    fn test_shipped_config_loads() {
        let config = Config::from_toml(include_str!("../config.toml")).unwrap();
        assert_eq!(config.cities.len(), 6);
        assert_eq!(config.cities[0].stations, vec!["KNYC", "KLGA"]);
        assert_eq!(config.rate_model.damping_tiers, vec![(5.0, 0.8), (3.0, 0.6)]);
        assert!(!config.edge.reference_as_independent);
    }
}
