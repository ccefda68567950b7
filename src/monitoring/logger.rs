use anyhow::Result;
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use crate::strategies::types::ModelOutcome;
use crate::strategies::weather_edge::{CityReport, MarketReport};

const HEADER: &str = "timestamp,city,target,series,station,implied,reference,model_status,independent,\
gap,recommendation,confidence,score,tier,favourite,feeds_down";

/// Append-only audit trail: one row per market per cycle.
pub struct CsvLogger {
    log_path: String,
}

impl CsvLogger {
    pub fn new(log_path: String) -> Result<Self> {
        if !std::path::Path::new(&log_path).exists() {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .open(&log_path)?;

            writeln!(file, "{}", HEADER)?;
        }

        Ok(Self { log_path })
    }

    pub fn log_report(&self, report: &CityReport) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.log_path)?;

        for market in report.markets() {
            writeln!(file, "{}", report_row(report, market))?;
        }
        Ok(())
    }

    pub fn log_event(&self, event: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.log_path)?;

        writeln!(
            file,
            "{},EVENT,{},,,,,,,,,,,,,",
            Utc::now().to_rfc3339(),
            sanitize(event)
        )?;

        Ok(())
    }
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

/// Commas would shift columns.
fn sanitize(text: &str) -> String {
    text.replace(',', ";").replace('\n', " ")
}

pub fn report_row(report: &CityReport, market: &MarketReport) -> String {
    let model_status = match &market.model {
        ModelOutcome::Estimate(_) => "estimate".to_string(),
        ModelOutcome::InsufficientData { .. } => "insufficient_data".to_string(),
        ModelOutcome::Blocked { reason, .. } => format!("blocked: {}", reason),
    };
    let feeds_down: Vec<String> = report
        .unavailable_feeds()
        .map(|s| sanitize(&s.to_string()))
        .collect();

    format!(
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        report.generated_at.to_rfc3339(),
        report.city_key,
        market.target,
        market.series,
        report.station.as_deref().unwrap_or(""),
        opt(market.market.as_ref().map(|e| e.value)),
        opt(market.reference.as_ref().map(|e| e.value)),
        model_status,
        opt(market.model.estimate().map(|e| e.value)),
        opt(market.edge.as_ref().map(|e| e.gap)),
        market.edge.as_ref().map(|e| e.recommendation.to_string()).unwrap_or_default(),
        market.edge.as_ref().map(|e| e.confidence_tier.to_string()).unwrap_or_default(),
        market.score.as_ref().map(|s| s.total.to_string()).unwrap_or_default(),
        market.score.as_ref().map(|s| s.tier.to_string()).unwrap_or_default(),
        market.favourite.as_ref().map(|p| p.bracket.ticker.clone()).unwrap_or_default(),
        feeds_down.join(" | "),
    )
}
