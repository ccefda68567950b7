use crate::config::{CityConfig, Config, EdgeConfig};
use crate::data::brackets::BracketNormalizer;
use crate::data::kalshi::{trading_date, KalshiClient};
use crate::data::sources::first_available;
use crate::data::types::{Bracket, ForecastTarget, ObservationSample, OfficialForecast, RawMarket};
use crate::data::weather::WeatherClient;
use crate::error::{Feed, FeedError};
use crate::strategies::edge::evaluate_edge;
use crate::strategies::edge_score::{recent_rate, score_edge, EdgeScore, EntryWindow, ScoreInputs};
use crate::strategies::market_implied::{bracket_for_value, favourite_pick, market_implied_estimate, BracketPick};
use crate::strategies::model::{build_model, ForecastContext, ForecastModel};
use crate::strategies::types::{EdgeResult, ForecastEstimate, ModelOutcome};
use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fmt;
use tracing::{debug, info, warn};

/// Per-feed outcome of a cycle, kept so the report can say which feed was
/// missing and why.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedStatus {
    Available { feed: Feed, source: String },
    Unavailable { feed: Feed, source: String, reason: String },
}

impl FeedStatus {
    fn from_result<T>(feed: Feed, source: &str, result: &Result<T, FeedError>) -> Self {
        match result {
            Ok(_) => FeedStatus::Available {
                feed,
                source: source.to_string(),
            },
            Err(e) => FeedStatus::Unavailable {
                feed,
                source: source.to_string(),
                reason: e.to_string(),
            },
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, FeedStatus::Available { .. })
    }
}

impl fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedStatus::Available { feed, source } => write!(f, "{} ok ({})", feed, source),
            FeedStatus::Unavailable { feed, source, reason } => {
                write!(f, "{} unavailable ({}): {}", feed, source, reason)
            }
        }
    }
}

/// Readings from whichever station answered first.
#[derive(Debug, Clone, PartialEq)]
pub struct StationReadings {
    pub station: String,
    pub latest: Option<ObservationSample>,
    pub history: Vec<ObservationSample>,
}

/// Everything computed for one market (daily high or daily low).
#[derive(Debug, Clone)]
pub struct MarketReport {
    pub target: ForecastTarget,
    pub series: String,
    pub brackets: Vec<Bracket>,
    pub market: Option<ForecastEstimate>,
    pub reference: Option<ForecastEstimate>,
    pub model: ModelOutcome,
    pub edge: Option<EdgeResult>,
    pub score: Option<EdgeScore>,
    pub favourite: Option<BracketPick>,
    /// Bracket the independent forecast would settle in.
    pub forecast_bracket: Option<Bracket>,
}

impl MarketReport {
    pub fn is_blocked(&self) -> bool {
        self.model.is_blocked()
    }
}

#[derive(Debug, Clone)]
pub struct CityReport {
    pub city_key: String,
    pub city_name: String,
    pub generated_at: DateTime<Utc>,
    pub local_hour: f64,
    pub entry_window: EntryWindow,
    pub station: Option<String>,
    pub current: Option<ObservationSample>,
    pub high: MarketReport,
    pub low: MarketReport,
    pub feeds: Vec<FeedStatus>,
}

impl CityReport {
    pub fn markets(&self) -> [&MarketReport; 2] {
        [&self.high, &self.low]
    }

    pub fn unavailable_feeds(&self) -> impl Iterator<Item = &FeedStatus> {
        self.feeds.iter().filter(|s| !s.is_available())
    }
}

/// Pure part of a cycle: raw feed data in, market report out. No I/O.
pub struct EdgePipeline {
    normalizer: BracketNormalizer,
    model: Box<dyn ForecastModel>,
    edge: EdgeConfig,
}

/// Inputs for one market assessment. Missing feeds are `None`/empty.
pub struct MarketInputs<'a> {
    pub target: ForecastTarget,
    pub series: &'a str,
    pub markets: Option<&'a [RawMarket]>,
    pub readings: Option<&'a StationReadings>,
    pub reference: Option<f64>,
    pub tz: Tz,
    pub now: DateTime<Utc>,
}

impl EdgePipeline {
    pub fn new(normalizer: BracketNormalizer, model: Box<dyn ForecastModel>, edge: EdgeConfig) -> Self {
        Self { normalizer, model, edge }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let normalizer = BracketNormalizer::new(config.normalizer.clone())?;
        Ok(Self::new(normalizer, build_model(config), config.edge.clone()))
    }

    pub fn assess(&self, inputs: &MarketInputs<'_>) -> MarketReport {
        let brackets = inputs
            .markets
            .map(|m| self.normalizer.normalize(m))
            .unwrap_or_default();
        let market = market_implied_estimate(&brackets);
        let reference = inputs.reference.map(ForecastEstimate::official);

        let ctx = ForecastContext {
            target: inputs.target,
            now: inputs.now,
            tz: inputs.tz,
            current: inputs.readings.and_then(|r| r.latest.clone()),
        };
        let history: &[ObservationSample] = inputs.readings.map(|r| r.history.as_slice()).unwrap_or(&[]);

        let model = match inputs.readings {
            Some(_) => self.model.estimate(history, &ctx),
            None => ModelOutcome::insufficient("observation feed unavailable"),
        };

        // A blocked model means no trade today: nothing downstream runs.
        let (edge, score, forecast_bracket) = match &model {
            ModelOutcome::Blocked { reason, diagnostics } => {
                warn!(
                    "{} {}: blocked ({}), max reversal {:.2}°, zigzag {:.2}",
                    inputs.series, inputs.target, reason, diagnostics.max_reversal, diagnostics.zigzag_ratio
                );
                (None, None, None)
            }
            _ => {
                let independent = model.estimate();
                let edge = evaluate_edge(independent, reference.as_ref(), market.as_ref(), &self.edge);
                let score = edge.as_ref().map(|e| {
                    let current = ctx.current_reading(history);
                    score_edge(
                        &ScoreInputs {
                            cushion: e.gap.abs(),
                            recent_rate: recent_rate(&ctx.todays_samples(history), &ctx.tz),
                            direction: e.recommendation,
                            local_hour: ctx.local_hour(),
                            cloud_cover_pct: current.and_then(|c| c.cloud_cover_pct),
                            wind_mph: current.and_then(|c| c.wind_speed),
                        },
                        &self.edge,
                    )
                });
                let forecast_bracket = independent.and_then(|i| bracket_for_value(&brackets, i.value)).cloned();
                (edge, score, forecast_bracket)
            }
        };

        if let Some(e) = &edge {
            debug!(
                "{} {}: independent {:.1}° vs {:?} {:.1}° → {} ({})",
                inputs.series, inputs.target, e.independent, e.comparator, e.comparator_value, e.recommendation,
                e.confidence_tier
            );
        }

        MarketReport {
            target: inputs.target,
            series: inputs.series.to_string(),
            favourite: favourite_pick(&brackets, self.edge.max_entry_price),
            brackets,
            market,
            reference,
            model,
            edge,
            score,
            forecast_bracket,
        }
    }
}

/// Runs one cycle per city: fetch both feeds, then assess both markets.
pub struct WeatherEdgeStrategy {
    kalshi: KalshiClient,
    weather: WeatherClient,
    pipeline: EdgePipeline,
}

impl WeatherEdgeStrategy {
    pub fn new(kalshi: KalshiClient, weather: WeatherClient, pipeline: EdgePipeline) -> Self {
        Self {
            kalshi,
            weather,
            pipeline,
        }
    }

    async fn fetch_readings(&self, city: &CityConfig) -> Result<StationReadings, FeedError> {
        let (station, history) = first_available(Feed::Observation, &city.stations, |station| async move {
            self.weather.fetch_history(&station).await
        })
        .await?;

        let latest = match self.weather.fetch_latest(&station).await {
            Ok(sample) => Some(sample),
            Err(e) => {
                warn!("{}: latest reading unavailable, using history only: {}", station, e);
                None
            }
        };

        Ok(StationReadings {
            station,
            latest,
            history,
        })
    }

    /// Feeds are fetched in sequence (market high, market low, observations,
    /// forecast). A failed feed only blanks its own branch of the report.
    pub async fn analyze_city(&self, city: &CityConfig, now: DateTime<Utc>) -> Result<CityReport> {
        let tz = city.tz()?;
        let today = trading_date(now, tz);
        info!("Analyzing {} ({})", city.name, today);

        let high_markets = self.kalshi.fetch_todays_markets(&city.high_series, today).await;
        let low_markets = self.kalshi.fetch_todays_markets(&city.low_series, today).await;
        let readings = self.fetch_readings(city).await;
        let forecast = self.weather.fetch_forecast(&city.grid).await;

        let station_label = match &readings {
            Ok(r) => r.station.clone(),
            Err(_) => city.stations.join(","),
        };
        let feeds = vec![
            FeedStatus::from_result(Feed::Market, &city.high_series, &high_markets),
            FeedStatus::from_result(Feed::Market, &city.low_series, &low_markets),
            FeedStatus::from_result(Feed::Observation, &station_label, &readings),
            FeedStatus::from_result(Feed::Forecast, &city.grid.office, &forecast),
        ];
        for status in feeds.iter().filter(|s| !s.is_available()) {
            warn!("{}: {}", city.key, status);
        }

        let readings = readings.ok();
        let forecast: Option<OfficialForecast> = forecast.ok();

        let assess = |target: ForecastTarget, series: &str, markets: &Result<Vec<RawMarket>, FeedError>| {
            self.pipeline.assess(&MarketInputs {
                target,
                series,
                markets: markets.as_ref().ok().map(|m| m.as_slice()),
                readings: readings.as_ref(),
                reference: forecast.and_then(|f| f.for_target(target)),
                tz,
                now,
            })
        };
        let high = assess(ForecastTarget::DailyHigh, &city.high_series, &high_markets);
        let low = assess(ForecastTarget::DailyLow, &city.low_series, &low_markets);

        let local_hour = crate::data::types::local_hour(&now, &tz);
        Ok(CityReport {
            city_key: city.key.clone(),
            city_name: city.name.clone(),
            generated_at: now,
            local_hour,
            entry_window: EntryWindow::from_hour(local_hour),
            station: readings.as_ref().map(|r| r.station.clone()),
            current: readings
                .as_ref()
                .and_then(|r| r.latest.clone().or_else(|| r.history.last().cloned())),
            high,
            low,
            feeds,
        })
    }
}
