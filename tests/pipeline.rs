use chrono::{DateTime, TimeZone, Utc};
use temp_edge::config::Config;
use temp_edge::data::types::{ForecastTarget, ObservationSample, RawMarket};
use temp_edge::monitoring::report::render_market;
use temp_edge::strategies::types::{
    BlockReason, Comparator, Confidence, ForecastMethod, ModelOutcome, Recommendation, ScoreTier,
};
use temp_edge::strategies::weather_edge::{EdgePipeline, MarketInputs, MarketReport, StationReadings};

const CITY: &str = r#"
    [[cities]]
    key = "NYC"
    name = "New York (Central Park)"
    timezone = "America/New_York"
    high_series = "KXHIGHNY"
    low_series = "KXLOWTNYC"
    stations = ["KNYC", "KLGA"]
    grid = { office = "OKX", x = 33, y = 37 }
"#;

fn pipeline(model: &str) -> EdgePipeline {
    let text = format!("[edge]\nmodel = \"{}\"\n{}", model, CITY);
    let config = Config::from_toml(&text).unwrap();
    EdgePipeline::from_config(&config).unwrap()
}

/// New York local time on 2025-01-15 (UTC-5).
fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, hour + 5, minute, 0).unwrap()
}

fn reading(hour: u32, temperature: f64) -> ObservationSample {
    ObservationSample {
        timestamp: at(hour, 0),
        temperature,
        dew_point: None,
        wind_speed: None,
        wind_direction: None,
        cloud_cover_pct: None,
        description: None,
    }
}

fn market(series: &str, label: &str, yes_ask: f64) -> RawMarket {
    RawMarket {
        ticker: format!("{}-25JAN15-{}", series, label.replace(' ', "")),
        event_ticker: format!("{}-25JAN15", series),
        label: label.to_string(),
        yes_ask: Some(yes_ask),
        ..RawMarket::default()
    }
}

fn high_book() -> Vec<RawMarket> {
    vec![
        market("KXHIGHNY", "44° to 45°", 20.0),
        market("KXHIGHNY", "40° to 41°", 40.0),
        market("KXHIGHNY", "42° to 43°", 55.0),
    ]
}

fn history(temps: &[(u32, f64)]) -> StationReadings {
    StationReadings {
        station: "KNYC".to_string(),
        latest: None,
        history: temps.iter().map(|&(h, t)| reading(h, t)).collect(),
    }
}

fn assess_high(pipeline: &EdgePipeline, book: &[RawMarket], readings: &StationReadings) -> MarketReport {
    pipeline.assess(&MarketInputs {
        target: ForecastTarget::DailyHigh,
        series: "KXHIGHNY",
        markets: Some(book),
        readings: Some(readings),
        reference: Some(44.0),
        tz: chrono_tz::America::New_York,
        now: at(10, 30),
    })
}

#[test]
fn steady_morning_rate_edge_against_market() {
    let book = high_book();
    let readings = history(&[(7, 30.0), (8, 32.0), (9, 34.0), (10, 36.0)]);
    let report = assess_high(&pipeline("rate"), &book, &readings);

    // normalized and sorted by midpoint
    let lows: Vec<f64> = report.brackets.iter().filter_map(|b| b.lower_bound).collect();
    assert_eq!(lows, vec![40.0, 42.0, 44.0]);

    let implied = report.market.as_ref().unwrap().value;
    let expected = (40.5 * 0.40 + 42.5 * 0.55 + 44.5 * 0.20) / 1.15;
    assert!((implied - expected).abs() < 1e-9);

    let estimate = report.model.estimate().unwrap();
    assert_eq!(estimate.method, ForecastMethod::RateExtrapolation);
    assert!((estimate.value - 45.0).abs() < 1e-9);

    let edge = report.edge.as_ref().unwrap();
    assert_eq!(edge.comparator, Comparator::Market);
    assert_eq!(edge.recommendation, Recommendation::FavorHigher);
    assert_eq!(edge.confidence_tier, Confidence::High);

    let score = report.score.as_ref().unwrap();
    assert_eq!((score.cushion, score.pace, score.time_of_day, score.weather), (2, 3, 1, 0));
    assert_eq!(score.tier, ScoreTier::Good);

    assert_eq!(report.forecast_bracket.as_ref().unwrap().lower_bound, Some(44.0));
    assert_eq!(report.favourite.as_ref().unwrap().bracket.lower_bound, Some(42.0));
}

#[test]
fn ensemble_averages_rate_and_physical() {
    let book = high_book();
    let readings = history(&[(7, 30.0), (8, 32.0), (9, 34.0), (10, 36.0)]);
    let report = assess_high(&pipeline("ensemble"), &book, &readings);

    // rate 45.0, physical 36 + 4.5h * 1.5°/h = 42.75
    let estimate = report.model.estimate().unwrap();
    assert_eq!(estimate.method, ForecastMethod::Ensemble);
    assert!((estimate.value - 43.875).abs() < 1e-9);
    assert_eq!(estimate.confidence, Confidence::Low);

    let edge = report.edge.as_ref().unwrap();
    assert_eq!(edge.confidence_tier, Confidence::Medium);
}

#[test]
fn erratic_morning_blocks_the_day() {
    let book = high_book();
    let readings = history(&[(7, 30.0), (8, 32.0), (9, 30.5), (10, 33.0)]);
    let report = assess_high(&pipeline("ensemble"), &book, &readings);

    match &report.model {
        ModelOutcome::Blocked { reason, diagnostics } => {
            assert_eq!(*reason, BlockReason::LargeReversal);
            assert_eq!(diagnostics.sample_count, 4);
            assert!(diagnostics.max_reversal > 1.2);
        }
        other => panic!("expected a block, got {:?}", other),
    }
    assert!(report.edge.is_none());
    assert!(report.score.is_none());
    assert!(report.forecast_bracket.is_none());
    // the market view is still reported
    assert!(report.market.is_some());

    let text = render_market(&report);
    assert!(text.contains("BLOCKED"));
    assert!(text.contains("zigzag"));
}

#[test]
fn too_few_morning_readings_is_not_a_guess() {
    let book = high_book();
    let readings = history(&[(9, 34.0)]);
    let report = assess_high(&pipeline("rate"), &book, &readings);

    assert!(matches!(report.model, ModelOutcome::InsufficientData { .. }));
    assert!(report.edge.is_none());
    assert!(render_market(&report).contains("INSUFFICIENT DATA"));
}

#[test]
fn overnight_low_respects_dew_point_floor() {
    let book = vec![
        market("KXLOWTNYC", "33° or below", 30.0),
        market("KXLOWTNYC", "34° to 35°", 45.0),
        market("KXLOWTNYC", "36° or above", 25.0),
    ];
    let mut now_reading = reading(2, 38.0);
    now_reading.dew_point = Some(36.0);
    now_reading.cloud_cover_pct = Some(0.0);
    now_reading.wind_speed = Some(0.0);
    let readings = StationReadings {
        station: "KNYC".to_string(),
        latest: Some(now_reading),
        history: vec![reading(0, 39.0), reading(1, 38.5)],
    };

    let report = pipeline("ensemble").assess(&MarketInputs {
        target: ForecastTarget::DailyLow,
        series: "KXLOWTNYC",
        markets: Some(book.as_slice()),
        readings: Some(&readings),
        reference: Some(35.0),
        tz: chrono_tz::America::New_York,
        now: at(2, 30),
    });

    let estimate = report.model.estimate().unwrap();
    assert_eq!(estimate.method, ForecastMethod::PhysicalCooling);
    assert_eq!(estimate.value, 34.0);
    assert_eq!(report.forecast_bracket.as_ref().unwrap().lower_bound, Some(34.0));

    // 30.5, 34.5 and 38.5 weighted 0.30 / 0.45 / 0.25
    let implied = report.market.as_ref().unwrap().value;
    assert!((implied - (30.5 * 0.30 + 34.5 * 0.45 + 38.5 * 0.25)).abs() < 1e-9);
}
