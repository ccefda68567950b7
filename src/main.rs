use anyhow::{Context, Result};
use chrono::Utc;
use futures::future::join_all;
use std::time::Duration;
use temp_edge::config::{Config, EnvConfig};
use temp_edge::data::kalshi::KalshiClient;
use temp_edge::data::retry::RetryPolicy;
use temp_edge::data::weather::WeatherClient;
use temp_edge::execution::session::SessionContext;
use temp_edge::monitoring::logger::CsvLogger;
use temp_edge::monitoring::report::{render_city, render_positions};
use temp_edge::strategies::weather_edge::{CityReport, EdgePipeline, WeatherEdgeStrategy};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,temp_edge=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!("🌡️ Temperature edge finder starting...");

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&config_path)?;
    let env_config = EnvConfig::load()?;

    info!("Cities: {}", config.cities.iter().map(|c| c.key.as_str()).collect::<Vec<_>>().join(", "));
    info!("Model: {:?}", config.edge.model);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.infrastructure.request_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let kalshi = KalshiClient::new(
        client.clone(),
        env_config.kalshi_api_url.clone(),
        RetryPolicy::from_config(&config.infrastructure),
    );
    let weather = WeatherClient::new(client, &env_config, &config.infrastructure);
    let strategy = WeatherEdgeStrategy::new(kalshi, weather, EdgePipeline::from_config(&config)?);

    let session = SessionContext::from_seeds(&config.positions, Utc::now())?;
    let logger = if config.monitoring.csv_logging {
        let logger = CsvLogger::new(config.monitoring.csv_log_path.clone())?;
        logger.log_event(&format!("session started with {} cities", config.cities.len()))?;
        Some(logger)
    } else {
        None
    };

    let interval = Duration::from_secs(config.system.polling_interval_secs);
    loop {
        let now = Utc::now();
        let results = join_all(config.cities.iter().map(|city| strategy.analyze_city(city, now))).await;

        let mut reports: Vec<CityReport> = Vec::new();
        for (city, result) in config.cities.iter().zip(results) {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => error!("{}: cycle failed: {:#}", city.key, e),
            }
        }

        for report in &reports {
            println!("{}", render_city(report));
            if let Some(logger) = &logger {
                if let Err(e) = logger.log_report(report) {
                    warn!("Failed to write CSV log: {}", e);
                }
            }
        }

        let brackets: Vec<_> = reports
            .iter()
            .flat_map(|r| r.markets())
            .flat_map(|m| m.brackets.iter().cloned())
            .collect();
        print!("{}", render_positions(&session.mark_to_market(&brackets)));

        if config.system.run_once {
            break;
        }

        info!("Next refresh in {}s", interval.as_secs());
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                break;
            }
        }
    }

    Ok(())
}
