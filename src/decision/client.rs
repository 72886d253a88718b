//! HTTP client for the decision endpoint

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::request::DecisionRequest;
use crate::common::errors::{Result, TraderError};
use crate::common::traits::DecisionProvider;
use crate::common::types::Signal;
use crate::config::types::DecisionConfig;

#[derive(Debug, Deserialize)]
struct DecisionResponse {
    #[serde(default)]
    direction: Option<String>,
}

/// Decision provider that POSTs the feature payload as JSON
#[derive(Debug, Clone)]
pub struct HttpDecisionClient {
    client: Client,
    endpoint: String,
}

impl HttpDecisionClient {
    pub fn new(config: &DecisionConfig) -> Result<Self> {
        Self::with_timeout(
            &config.endpoint,
            Duration::from_secs(config.timeout_seconds.max(1)),
        )
    }

    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TraderError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl DecisionProvider for HttpDecisionClient {
    /// A missing `direction` field counts as hold; transport and status
    /// failures are errors for the caller to downgrade.
    #[instrument(skip(self, request), fields(symbol = %request.symbol))]
    async fn decide(&self, request: &DecisionRequest) -> Result<Signal> {
        let response = self.client.post(&self.endpoint).json(request).send().await?;

        if !response.status().is_success() {
            return Err(TraderError::InvalidResponse(format!(
                "Decision endpoint returned status: {}",
                response.status()
            )));
        }

        let body: DecisionResponse = response.json().await?;
        let signal = body
            .direction
            .as_deref()
            .map_or(Signal::Hold, Signal::from_label);
        debug!("Decision provider answered {}", signal);
        Ok(signal)
    }
}
