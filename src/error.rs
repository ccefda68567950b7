use std::fmt;

/// Upstream feed a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    Market,
    Observation,
    Forecast,
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feed::Market => write!(f, "market feed"),
            Feed::Observation => write!(f, "observation feed"),
            Feed::Forecast => write!(f, "forecast feed"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("{feed} request failed: {source}")]
    Http {
        feed: Feed,
        #[source]
        source: reqwest::Error,
    },

    #[error("{feed} timed out")]
    Timeout { feed: Feed },

    #[error("{feed} returned HTTP {status}: {body}")]
    Status { feed: Feed, status: u16, body: String },

    #[error("{feed} returned malformed data: {source}")]
    Decode {
        feed: Feed,
        #[source]
        source: serde_json::Error,
    },

    #[error("{feed} returned no usable data: {what}")]
    Empty { feed: Feed, what: String },
}

impl FeedError {
    pub fn http(feed: Feed, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            FeedError::Timeout { feed }
        } else {
            FeedError::Http { feed, source }
        }
    }

    pub fn empty(feed: Feed, what: impl Into<String>) -> Self {
        FeedError::Empty {
            feed,
            what: what.into(),
        }
    }

    pub fn feed(&self) -> Feed {
        match self {
            FeedError::Http { feed, .. }
            | FeedError::Timeout { feed }
            | FeedError::Status { feed, .. }
            | FeedError::Decode { feed, .. }
            | FeedError::Empty { feed, .. } => *feed,
        }
    }

    /// Transport failures, timeouts, rate limits and server errors are worth
    /// another attempt; client errors and bad payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            FeedError::Http { .. } | FeedError::Timeout { .. } => true,
            FeedError::Status { status, .. } => *status == 429 || *status >= 500,
            FeedError::Decode { .. } | FeedError::Empty { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_names_feed_and_reason() {
        let err = FeedError::Status {
            feed: Feed::Market,
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "market feed returned HTTP 503: unavailable");

        let err = FeedError::empty(Feed::Observation, "no readings for KNYC");
        assert_eq!(
            err.to_string(),
            "observation feed returned no usable data: no readings for KNYC"
        );
    }

    #[test]
    fn test_transient_classification() {
        let server = FeedError::Status { feed: Feed::Forecast, status: 502, body: String::new() };
        let limited = FeedError::Status { feed: Feed::Forecast, status: 429, body: String::new() };
        let missing = FeedError::Status { feed: Feed::Forecast, status: 404, body: String::new() };

        assert!(server.is_transient());
        assert!(limited.is_transient());
        assert!(!missing.is_transient());
        assert!(FeedError::Timeout { feed: Feed::Market }.is_transient());
        assert!(!FeedError::empty(Feed::Market, "no markets").is_transient());
    }
}
