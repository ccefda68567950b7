use crate::error::{Feed, FeedError};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::warn;

const MAX_BODY_IN_ERROR: usize = 200;

/// GET a JSON document, mapping every failure onto the feed it came from.
pub async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    feed: Feed,
    user_agent: Option<&str>,
) -> Result<T, FeedError> {
    let mut req = client.get(url);
    if let Some(ua) = user_agent {
        req = req.header(reqwest::header::USER_AGENT, ua);
    }

    let resp = req.send().await.map_err(|e| FeedError::http(feed, e))?;
    let status = resp.status();
    let bytes = resp.bytes().await.map_err(|e| FeedError::http(feed, e))?;

    if !status.is_success() {
        let body: String = String::from_utf8_lossy(&bytes)
            .chars()
            .take(MAX_BODY_IN_ERROR)
            .collect();
        warn!("GET {} failed: status={}, body={}", url, status, body);
        return Err(FeedError::Status {
            feed,
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_slice::<T>(&bytes).map_err(|source| FeedError::Decode { feed, source })
}
