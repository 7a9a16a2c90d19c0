use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::PredictClient;
use crate::error::ClientError;
use crate::models::PredictionResult;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080/api/predict";

/// Posts `{ "text": ... }` to the prediction endpoint.
#[derive(Debug, Clone)]
pub struct HttpPredictClient {
    http: reqwest::Client,
    url: String,
}

impl HttpPredictClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for HttpPredictClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

#[async_trait]
impl PredictClient for HttpPredictClient {
    async fn predict(&self, text: &str) -> Result<PredictionResult, ClientError> {
        debug!(url = %self.url, "sending request to API");
        let response = self
            .http
            .post(&self.url)
            .json(&json!({ "text": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|err| ClientError::Decode(err.to_string()))
    }
}
