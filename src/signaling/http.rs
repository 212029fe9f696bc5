//! HTTP transport for the offer/answer exchange

use crate::signaling::{NegotiationRequest, NegotiationResponse};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// One round-trip of the offer/answer exchange
///
/// The negotiation engine only depends on this trait; [`HttpSignaling`] is
/// the production implementation.
#[async_trait]
pub trait SignalingExchange: Send + Sync {
    /// Send an offer and wait for the corresponding answer
    async fn exchange(&self, request: &NegotiationRequest) -> Result<NegotiationResponse>;
}

/// Signaling exchange over HTTP POST
pub struct HttpSignaling {
    endpoint: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl HttpSignaling {
    /// Create a client for the given signaling endpoint
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Exchange URL (e.g. `http://host:8099/api/v1/signaling`)
    /// * `auth_token` - Optional bearer credential sent with every request
    pub fn new(endpoint: impl Into<String>, auth_token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Signaling(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            auth_token,
            client,
        })
    }

    fn build_auth_header(&self) -> Option<String> {
        self.auth_token
            .as_ref()
            .map(|token| format!("Bearer {}", token))
    }
}

#[async_trait]
impl SignalingExchange for HttpSignaling {
    async fn exchange(&self, request: &NegotiationRequest) -> Result<NegotiationResponse> {
        debug!("POST {} ({})", self.endpoint, request.kind);

        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(auth) = self.build_auth_header() {
            builder = builder.header("authorization", auth);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Signaling(format!("Exchange request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Signaling(format!(
                "Exchange failed with status {}: {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Signaling(format!("Failed to read exchange response: {}", e)))?;
        parse_answer(&body)
    }
}

/// Decode an exchange response body
///
/// A success status with an undecodable body is a malformed remote
/// description, not a transport failure.
fn parse_answer(body: &str) -> Result<NegotiationResponse> {
    serde_json::from_str(body)
        .map_err(|e| Error::Protocol(format!("Invalid exchange response: {}", e)))
}
