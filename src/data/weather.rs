use crate::config::{EnvConfig, GridPoint, InfrastructureConfig};
use crate::data::cache::TtlCache;
use crate::data::http::get_json;
use crate::data::retry::{with_retry, RetryPolicy};
use crate::data::types::{celsius_to_fahrenheit, kmh_to_mph, ObservationSample, OfficialForecast};
use crate::error::{Feed, FeedError};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Only the first few periods describe today and tonight.
const FORECAST_PERIODS_SCANNED: usize = 4;

pub struct WeatherClient {
    client: Client,
    base_url: String,
    user_agent: String,
    retry: RetryPolicy,
    history_limit: usize,
    forecast_cache: TtlCache<OfficialForecast>,
}

#[derive(Debug, Deserialize)]
struct Quantity {
    value: Option<f64>,
    #[serde(rename = "unitCode", default)]
    unit_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CloudLayer {
    #[serde(default)]
    amount: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObservationProperties {
    timestamp: DateTime<Utc>,
    temperature: Quantity,
    #[serde(default)]
    dewpoint: Option<Quantity>,
    #[serde(default)]
    wind_speed: Option<Quantity>,
    #[serde(default)]
    wind_direction: Option<Quantity>,
    #[serde(default)]
    text_description: Option<String>,
    #[serde(default)]
    cloud_layers: Option<Vec<CloudLayer>>,
}

#[derive(Debug, Deserialize)]
struct LatestObservationResponse {
    properties: ObservationProperties,
}

#[derive(Debug, Deserialize)]
struct ObservationFeature {
    properties: ObservationProperties,
}

#[derive(Debug, Deserialize)]
struct ObservationCollection {
    #[serde(default)]
    features: Vec<ObservationFeature>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    properties: ForecastProperties,
}

#[derive(Debug, Deserialize)]
struct ForecastProperties {
    #[serde(default)]
    periods: Vec<ForecastPeriod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastPeriod {
    temperature: Option<f64>,
    #[serde(default)]
    temperature_unit: Option<String>,
    #[serde(default = "default_daytime")]
    is_daytime: bool,
}

fn default_daytime() -> bool {
    true
}

impl WeatherClient {
    pub fn new(client: Client, env: &EnvConfig, infra: &InfrastructureConfig) -> Self {
        Self {
            client,
            base_url: env.nws_api_url.trim_end_matches('/').to_string(),
            user_agent: env.nws_user_agent.clone(),
            retry: RetryPolicy::from_config(infra),
            history_limit: infra.observation_history_limit,
            forecast_cache: TtlCache::new(Duration::from_secs(infra.cache_ttl_forecast_secs)),
        }
    }

    /// Latest reading at a station. A reading without a temperature counts
    /// as unavailable.
    pub async fn fetch_latest(&self, station: &str) -> Result<ObservationSample, FeedError> {
        let url = format!("{}/stations/{}/observations/latest", self.base_url, station);

        let response: LatestObservationResponse = with_retry(&self.retry, station, || {
            get_json(&self.client, &url, Feed::Observation, Some(self.user_agent.as_str()))
        })
        .await?;

        to_sample(response.properties).ok_or_else(|| {
            FeedError::empty(Feed::Observation, format!("{} latest reading has no temperature", station))
        })
    }

    /// Recent readings at a station, oldest first.
    pub async fn fetch_history(&self, station: &str) -> Result<Vec<ObservationSample>, FeedError> {
        let url = format!(
            "{}/stations/{}/observations?limit={}",
            self.base_url, station, self.history_limit
        );

        let response: ObservationCollection = with_retry(&self.retry, station, || {
            get_json(&self.client, &url, Feed::Observation, Some(self.user_agent.as_str()))
        })
        .await?;

        let samples = collect_samples(response, self.history_limit);
        if samples.is_empty() {
            return Err(FeedError::empty(
                Feed::Observation,
                format!("{} has no recent readings", station),
            ));
        }
        debug!("{}: {} historical readings", station, samples.len());
        Ok(samples)
    }

    /// Today's official high and low from the gridded forecast.
    pub async fn fetch_forecast(&self, grid: &GridPoint) -> Result<OfficialForecast, FeedError> {
        let url = format!(
            "{}/gridpoints/{}/{},{}/forecast",
            self.base_url, grid.office, grid.x, grid.y
        );
        if let Some(cached) = self.forecast_cache.get(&url) {
            return Ok(cached);
        }

        let response: ForecastResponse = with_retry(&self.retry, &grid.office, || {
            get_json(&self.client, &url, Feed::Forecast, Some(self.user_agent.as_str()))
        })
        .await?;

        let forecast = extract_high_low(&response.properties.periods);
        if forecast.high.is_none() && forecast.low.is_none() {
            return Err(FeedError::empty(Feed::Forecast, "no day or night periods"));
        }
        self.forecast_cache.insert(url, forecast);
        Ok(forecast)
    }
}

fn to_fahrenheit(q: &Quantity) -> Option<f64> {
    let v = q.value.filter(|v| v.is_finite())?;
    match q.unit_code.as_deref() {
        Some(unit) if unit.ends_with("degF") => Some(v),
        _ => Some(celsius_to_fahrenheit(v)),
    }
}

fn to_mph(q: &Quantity) -> Option<f64> {
    let v = q.value.filter(|v| v.is_finite())?;
    match q.unit_code.as_deref() {
        Some(unit) if unit.ends_with("m_s-1") => Some(kmh_to_mph(v * 3.6)),
        Some(unit) if unit.ends_with("mi_h-1") => Some(v),
        _ => Some(kmh_to_mph(v)),
    }
}

/// METAR sky cover code → percent of sky covered.
pub fn cloud_amount_pct(amount: &str) -> Option<f64> {
    match amount.trim().to_uppercase().as_str() {
        "CLR" | "SKC" => Some(0.0),
        "FEW" => Some(25.0),
        "SCT" => Some(50.0),
        "BKN" => Some(75.0),
        "OVC" | "VV" => Some(100.0),
        _ => None,
    }
}

fn to_sample(p: ObservationProperties) -> Option<ObservationSample> {
    let temperature = to_fahrenheit(&p.temperature)?;

    let cloud_cover_pct = p.cloud_layers.as_ref().and_then(|layers| {
        if layers.is_empty() {
            return Some(0.0);
        }
        layers
            .iter()
            .filter_map(|l| cloud_amount_pct(&l.amount))
            .reduce(f64::max)
    });

    Some(ObservationSample {
        timestamp: p.timestamp,
        temperature,
        dew_point: p.dewpoint.as_ref().and_then(to_fahrenheit),
        wind_speed: p.wind_speed.as_ref().and_then(to_mph),
        wind_direction: p.wind_direction.as_ref().and_then(|q| q.value),
        cloud_cover_pct,
        description: p.text_description,
    })
}

fn collect_samples(response: ObservationCollection, limit: usize) -> Vec<ObservationSample> {
    let mut samples: Vec<ObservationSample> = response
        .features
        .into_iter()
        .filter_map(|f| to_sample(f.properties))
        .collect();
    samples.sort_by_key(|s| s.timestamp);
    if samples.len() > limit {
        samples.drain(..samples.len() - limit);
    }
    samples
}

/// First daytime period is today's high, first nighttime period tonight's low.
fn extract_high_low(periods: &[ForecastPeriod]) -> OfficialForecast {
    let mut forecast = OfficialForecast::default();

    for period in periods.iter().take(FORECAST_PERIODS_SCANNED) {
        let Some(temp) = period.temperature else { continue };
        let temp = if period.temperature_unit.as_deref() == Some("C") {
            celsius_to_fahrenheit(temp)
        } else {
            temp
        };

        if period.is_daytime && forecast.high.is_none() {
            forecast.high = Some(temp);
        } else if !period.is_daytime && forecast.low.is_none() {
            forecast.low = Some(temp);
        }
    }

    forecast
}
