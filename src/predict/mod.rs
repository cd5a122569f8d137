pub mod error;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::form::FeatureValue;
pub use error::{PredictError, GENERIC_SERVER_ERROR};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/predict";

/// Client for the remote prediction service
#[derive(Debug, Clone)]
pub struct PredictClient {
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    features: &'a [FeatureValue],
}

#[derive(Deserialize)]
struct PredictResponse {
    prediction: f64,
}

impl PredictClient {
    pub fn new(endpoint: &str) -> anyhow::Result<Self> {
        let endpoint = if endpoint.is_empty() {
            DEFAULT_ENDPOINT
        } else {
            endpoint
        };

        // No timeout: a slow service just keeps the request in flight
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST the feature vector and return the predicted score
    #[instrument(skip(self, features), fields(endpoint = %self.endpoint))]
    pub async fn predict(&self, features: &[FeatureValue]) -> Result<f64, PredictError> {
        tracing::debug!(?features, "Sending features");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&PredictRequest { features })
            .send()
            .await
            .map_err(|e| transport(format!("request failed: {e}")))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| transport(format!("unreadable response (HTTP {status}): {e}")))?;

        if status.is_success() {
            let parsed: PredictResponse = serde_json::from_value(body)
                .map_err(|e| transport(format!("no numeric prediction in response: {e}")))?;
            tracing::debug!(prediction = parsed.prediction, "Prediction received");
            Ok(parsed.prediction)
        } else {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or(GENERIC_SERVER_ERROR)
                .to_string();
            tracing::debug!(status = status.as_u16(), %message, "Prediction rejected");
            Err(PredictError::ServerRejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}

fn transport(detail: String) -> PredictError {
    tracing::warn!("{}", detail);
    PredictError::Transport { detail }
}

/// Round half-up to two decimals and print without trailing zeros
pub fn display_score(score: f64) -> String {
    let rounded = (score * 100.0 + 0.5).floor() / 100.0;
    format!("{}", rounded)
}
