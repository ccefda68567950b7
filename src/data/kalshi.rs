use crate::data::http::get_json;
use crate::data::retry::{with_retry, RetryPolicy};
use crate::data::types::RawMarket;
use crate::error::{Feed, FeedError};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

pub struct KalshiClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct KalshiMarketsResponse {
    #[serde(default)]
    markets: Vec<KalshiMarket>,
}

#[derive(Debug, Deserialize)]
struct KalshiMarket {
    #[serde(default)]
    ticker: String,
    #[serde(default)]
    event_ticker: String,
    #[serde(default)]
    subtitle: Option<String>,
    #[serde(default)]
    yes_sub_title: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    yes_bid: Option<f64>,
    #[serde(default)]
    yes_ask: Option<f64>,
    #[serde(default)]
    no_bid: Option<f64>,
    #[serde(default)]
    no_ask: Option<f64>,
    #[serde(default)]
    close_time: Option<String>,
}

impl KalshiClient {
    pub fn new(client: Client, base_url: String, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    /// Fetch every open market in a series.
    pub async fn fetch_series(&self, series_ticker: &str) -> Result<Vec<RawMarket>, FeedError> {
        let url = format!(
            "{}/markets?series_ticker={}&status=open",
            self.base_url, series_ticker
        );

        let response: KalshiMarketsResponse = with_retry(&self.retry, series_ticker, || {
            get_json(&self.client, &url, Feed::Market, None)
        })
        .await?;

        Ok(response.markets.into_iter().map(convert_market).collect())
    }

    /// Fetch the markets of today's event for a series. An empty series is
    /// reported as an error so callers can tell "no market data" apart from
    /// a snapshot with zero probability mass.
    pub async fn fetch_todays_markets(
        &self,
        series_ticker: &str,
        today: NaiveDate,
    ) -> Result<Vec<RawMarket>, FeedError> {
        let markets = self.fetch_series(series_ticker).await?;
        if markets.is_empty() {
            return Err(FeedError::empty(
                Feed::Market,
                format!("no open markets in series {}", series_ticker),
            ));
        }

        let selected = select_todays_markets(markets, today);
        info!("{}: {} brackets for {}", series_ticker, selected.len(), today);
        Ok(selected)
    }
}

fn convert_market(km: KalshiMarket) -> RawMarket {
    let non_empty = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
    let label = non_empty(km.subtitle)
        .or_else(|| non_empty(km.yes_sub_title))
        .or_else(|| non_empty(km.title))
        .unwrap_or_default();

    // Event page lists every bracket, so prefer it over the single market.
    let url = if km.event_ticker.is_empty() {
        format!("https://kalshi.com/markets/{}", km.ticker)
    } else {
        format!("https://kalshi.com/events/{}", km.event_ticker)
    };

    RawMarket {
        ticker: km.ticker,
        event_ticker: km.event_ticker,
        label,
        yes_bid: km.yes_bid,
        yes_ask: km.yes_ask,
        no_bid: km.no_bid,
        no_ask: km.no_ask,
        close_time: km.close_time,
        url,
    }
}

/// The date a city's events are listed under: its own local calendar day,
/// since each series settles on the local climate report.
pub fn trading_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Whether a market belongs to the event for `today`, matching the
/// date-encoded tickers ("25JAN15", "JAN-15") or the close-time date.
pub fn is_todays_market(market: &RawMarket, today: NaiveDate) -> bool {
    let compact = today.format("%y%b%d").to_string().to_uppercase();
    let dashed = today.format("%b-%d").to_string().to_uppercase();
    let iso = today.format("%Y-%m-%d").to_string();

    let event = market.event_ticker.to_uppercase();
    let ticker = market.ticker.to_uppercase();
    let closes_today = market
        .close_time
        .as_deref()
        .map_or(false, |t| t.starts_with(&iso));

    event.contains(&compact) || ticker.contains(&compact) || event.contains(&dashed) || closes_today
}

/// Keep today's markets. When nothing matches, fall back to the first
/// listed event's full set rather than returning nothing.
pub fn select_todays_markets(markets: Vec<RawMarket>, today: NaiveDate) -> Vec<RawMarket> {
    if markets.iter().any(|m| is_todays_market(m, today)) {
        return markets
            .into_iter()
            .filter(|m| is_todays_market(m, today))
            .collect();
    }

    let Some(first_event) = markets.first().map(|m| m.event_ticker.clone()) else {
        return Vec::new();
    };
    debug!("No market dated {}, falling back to event {}", today, first_event);
    markets
        .into_iter()
        .filter(|m| m.event_ticker == first_event)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(ticker: &str, event: &str, close: Option<&str>) -> RawMarket {
        RawMarket {
            ticker: ticker.to_string(),
            event_ticker: event.to_string(),
            close_time: close.map(|s| s.to_string()),
            ..Default::default()
        }
    }

    fn jan15() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    #[test]
    fn test_trading_date_follows_city_clock() {
        use chrono::TimeZone;
        // 00:30 Eastern on the 16th is still the 15th on the west coast
        let now = Utc.with_ymd_and_hms(2025, 1, 16, 5, 30, 0).unwrap();
        assert_eq!(trading_date(now, chrono_tz::America::New_York), jan15().succ_opt().unwrap());
        assert_eq!(trading_date(now, chrono_tz::America::Los_Angeles), jan15());
    }

    #[test]
    fn test_decode_markets_payload() {
        let json = r#"{
            "markets": [
                {"ticker": "KXHIGHNY-25JAN15-B47.5", "event_ticker": "KXHIGHNY-25JAN15",
                 "subtitle": "47° to 48°", "yes_bid": 30, "yes_ask": 34, "no_bid": 66, "no_ask": 70,
                 "close_time": "2025-01-16T04:59:00Z"},
                {"ticker": "KXHIGHNY-25JAN15-T50", "event_ticker": "KXHIGHNY-25JAN15",
                 "subtitle": "", "yes_sub_title": "50° or above", "yes_bid": null, "yes_ask": 3}
            ],
            "cursor": ""
        }"#;
        let response: KalshiMarketsResponse = serde_json::from_str(json).unwrap();
        let markets: Vec<RawMarket> = response.markets.into_iter().map(convert_market).collect();

        assert_eq!(markets.len(), 2);
        assert_eq!(markets[0].label, "47° to 48°");
        assert_eq!(markets[0].yes_ask, Some(34.0));
        assert_eq!(markets[0].url, "https://kalshi.com/events/KXHIGHNY-25JAN15");
        assert_eq!(markets[1].label, "50° or above");
        assert_eq!(markets[1].yes_bid, None);
    }

    #[test]
    fn test_missing_markets_field_is_empty() {
        let response: KalshiMarketsResponse = serde_json::from_str("{}").unwrap();
        assert!(response.markets.is_empty());
    }

    #[test]
    fn test_todays_market_matching() {
        let today = jan15();
        assert!(is_todays_market(&market("KXHIGHNY-25JAN15-B47.5", "KXHIGHNY-25JAN15", None), today));
        assert!(is_todays_market(&market("X", "HIGHNY-JAN-15", None), today));
        assert!(is_todays_market(&market("X", "Y", Some("2025-01-15T23:00:00Z")), today));
        assert!(!is_todays_market(&market("KXHIGHNY-25JAN16-B47.5", "KXHIGHNY-25JAN16", None), today));
    }

    #[test]
    fn test_filters_to_today() {
        let markets = vec![
            market("KXHIGHNY-25JAN14-B40.5", "KXHIGHNY-25JAN14", None),
            market("KXHIGHNY-25JAN15-B47.5", "KXHIGHNY-25JAN15", None),
            market("KXHIGHNY-25JAN15-B49.5", "KXHIGHNY-25JAN15", None),
        ];
        let selected = select_todays_markets(markets, jan15());
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|m| m.event_ticker == "KXHIGHNY-25JAN15"));
    }

    #[test]
    fn test_falls_back_to_first_event() {
        let markets = vec![
            market("KXHIGHNY-25JAN16-B47.5", "KXHIGHNY-25JAN16", None),
            market("KXHIGHNY-25JAN17-B47.5", "KXHIGHNY-25JAN17", None),
            market("KXHIGHNY-25JAN16-B49.5", "KXHIGHNY-25JAN16", None),
        ];
        let selected = select_todays_markets(markets, jan15());
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|m| m.event_ticker == "KXHIGHNY-25JAN16"));
    }

    #[test]
    fn test_empty_stays_empty() {
        assert!(select_todays_markets(Vec::new(), jan15()).is_empty());
    }
}
