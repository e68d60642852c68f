use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::ClientConfig;
use crate::services::aggregation::RouteView;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Server responded with {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),
}

/// Source of route views for the view model.
#[async_trait]
pub trait RouteFeed: Send + Sync + 'static {
    async fn fetch_routes(&self) -> Result<Vec<RouteView>, FeedError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct HttpRouteFeed {
    client: reqwest::Client,
    url: String,
}

impl HttpRouteFeed {
    pub fn new(config: &ClientConfig) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FeedError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: format!("{}/routes", config.api_base_url.trim_end_matches('/')),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RouteFeed for HttpRouteFeed {
    async fn fetch_routes(&self) -> Result<Vec<RouteView>, FeedError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            return Err(FeedError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Vec<RouteView>>()
            .await
            .map_err(|e| FeedError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_url_joins_base_without_double_slash() {
        let config = ClientConfig {
            api_base_url: "http://localhost:3000/api/".to_string(),
            poll_interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(1),
        };

        let feed = HttpRouteFeed::new(&config).unwrap();
        assert_eq!(feed.url(), "http://localhost:3000/api/routes");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_transport_failure() {
        // Port 9 (discard) is not expected to serve HTTP.
        let config = ClientConfig {
            api_base_url: "http://127.0.0.1:9/api".to_string(),
            poll_interval: Duration::from_secs(5),
            request_timeout: Duration::from_millis(500),
        };

        let feed = HttpRouteFeed::new(&config).unwrap();
        assert!(matches!(
            feed.fetch_routes().await,
            Err(FeedError::Transport(_))
        ));
    }
}
