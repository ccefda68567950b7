use crate::error::{Feed, FeedError};
use std::future::Future;
use tracing::{info, warn};

/// Try each source in priority order; the first one that returns a usable
/// result wins. Fetchers report empty results as errors, so `Ok` means
/// non-empty and decoded. When every source fails the last error is
/// returned.
pub async fn first_available<T, F, Fut>(
    feed: Feed,
    sources: &[String],
    mut fetch: F,
) -> Result<(String, T), FeedError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, FeedError>>,
{
    let mut last_err = None;

    for (i, source) in sources.iter().enumerate() {
        match fetch(source.clone()).await {
            Ok(value) => {
                if i > 0 {
                    info!("{} served by fallback source {}", feed, source);
                }
                return Ok((source.clone(), value));
            }
            Err(e) => {
                warn!("{} source {} unavailable: {}", feed, source, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| FeedError::empty(feed, "no sources configured")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stations(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_first_source_wins() {
        let (station, temp) = first_available(Feed::Observation, &stations(&["KNYC", "KLGA"]), |s| async move {
            Ok::<_, FeedError>(if s == "KNYC" { 41.0 } else { 43.0 })
        })
        .await
        .unwrap();

        assert_eq!(station, "KNYC");
        assert_eq!(temp, 41.0);
    }

    #[tokio::test]
    async fn test_falls_back_in_order() {
        let (station, temp) = first_available(Feed::Observation, &stations(&["KNYC", "KLGA", "KJFK"]), |s| async move {
            match s.as_str() {
                "KNYC" => Err(FeedError::empty(Feed::Observation, "null temperature")),
                "KLGA" => Ok(43.0),
                _ => Ok(44.0),
            }
        })
        .await
        .unwrap();

        assert_eq!(station, "KLGA");
        assert_eq!(temp, 43.0);
    }

    #[tokio::test]
    async fn test_all_failing_returns_last_error() {
        let err = first_available(Feed::Observation, &stations(&["KNYC", "KLGA"]), |s| async move {
            Err::<f64, _>(FeedError::empty(Feed::Observation, format!("nothing from {}", s)))
        })
        .await
        .unwrap_err();

        assert!(err.to_string().contains("KLGA"));
    }

    #[tokio::test]
    async fn test_no_sources() {
        let err = first_available(Feed::Forecast, &[], |_| async { Ok::<_, FeedError>(1) })
            .await
            .unwrap_err();
        assert_eq!(err.feed(), Feed::Forecast);
    }
}
