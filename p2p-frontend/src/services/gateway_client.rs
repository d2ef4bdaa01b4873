//! Signed HTTP client for the P2P CIS payment backend.
//!
//! Every call carries three headers: `Apipublic` (public key), `TimeStamp`
//! (Unix seconds) and `Signature` (HMAC-SHA512 over the sorted payload
//! values plus the timestamp, see [`p2p_core::utils::signature`]). The body
//! is the payload exactly as serialized.

use crate::config::GatewaySettings;
use crate::models::{Transaction, TransactionData, TransactionStatus};
use crate::services::metrics;
use async_trait::async_trait;
use p2p_core::observability::TracedClientExt;
use p2p_core::utils::signature::generate_signature;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const CREATE_TRANSACTION_PATH: &str = "/v2/transaction/create/in/P2P_CIS/";

pub const APIPUBLIC_HEADER: &str = "Apipublic";
pub const SIGNATURE_HEADER: &str = "Signature";
pub const TIMESTAMP_HEADER: &str = "TimeStamp";

const CREATE_FALLBACK_MESSAGE: &str = "Failed to create transaction";
const STATUS_FALLBACK_MESSAGE: &str = "Failed to check transaction status";

/// Status endpoint for `tracker_id`, escaped as a single path segment.
pub fn status_path(tracker_id: &str) -> String {
    format!("/v2/transaction/{}/", urlencoding::encode(tracker_id))
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Payment backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Payment backend rejected request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected payment backend response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Failed to sign request: {0}")]
    Signing(anyhow::Error),
}

/// The two calls the frontend makes against the payment backend.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_transaction(&self, data: &TransactionData) -> Result<Transaction, GatewayError>;

    async fn check_transaction_status(
        &self,
        tracker_id: &str,
    ) -> Result<TransactionStatus, GatewayError>;
}

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: TransactionStatus,
}

pub struct GatewayClient {
    client: Client,
    settings: GatewaySettings,
}

impl GatewayClient {
    pub fn new(settings: GatewaySettings) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        Ok(Self { client, settings })
    }

    pub fn base_url(&self) -> &str {
        self.settings.base_url.trim_end_matches('/')
    }

    /// POST `payload` to `path` with signature headers and return the raw
    /// success body. Non-2xx responses become [`GatewayError::Api`].
    async fn post_signed(
        &self,
        path: &str,
        payload: &Value,
        fallback_message: &str,
    ) -> Result<String, GatewayError> {
        let url = format!("{}{}", self.base_url(), path);
        let timestamp = chrono::Utc::now().timestamp();

        let signature = generate_signature(
            self.settings.private_key.expose_secret(),
            payload,
            timestamp,
        )
        .map_err(GatewayError::Signing)?;

        let response = self
            .client
            .traced_post(&url)
            .header(APIPUBLIC_HEADER, &self.settings.public_key)
            .header(SIGNATURE_HEADER, &signature)
            .header(TIMESTAMP_HEADER, &timestamp.to_string())
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(url = %url, error = %e, "Payment backend request failed");
                GatewayError::Transport(e)
            })?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(url = %url, status = %status, "Payment backend response");

        if status.is_success() {
            return Ok(body);
        }

        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback_message.to_string());

        tracing::warn!(
            url = %url,
            status = status.as_u16(),
            message = %message,
            "Payment backend rejected request"
        );

        Err(GatewayError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl PaymentGateway for GatewayClient {
    async fn create_transaction(&self, data: &TransactionData) -> Result<Transaction, GatewayError> {
        let payload = serde_json::to_value(data)?;
        let started = Instant::now();

        let result = self
            .post_signed(CREATE_TRANSACTION_PATH, &payload, CREATE_FALLBACK_MESSAGE)
            .await
            .and_then(|body| Ok(serde_json::from_str::<Transaction>(&body)?));

        metrics::record_gateway_call("create_transaction", result.is_ok(), started.elapsed());

        let transaction = result?;
        tracing::info!(
            tracker_id = %transaction.tracker_id,
            currency = %transaction.currency,
            amount = transaction.amount,
            status = %transaction.status,
            "Transaction created"
        );
        Ok(transaction)
    }

    async fn check_transaction_status(
        &self,
        tracker_id: &str,
    ) -> Result<TransactionStatus, GatewayError> {
        let payload = Value::Object(serde_json::Map::new());
        let started = Instant::now();

        let result = self
            .post_signed(&status_path(tracker_id), &payload, STATUS_FALLBACK_MESSAGE)
            .await
            .and_then(|body| Ok(serde_json::from_str::<StatusResponse>(&body)?.status));

        metrics::record_gateway_call("check_status", result.is_ok(), started.elapsed());

        let status = result?;
        tracing::debug!(tracker_id = %tracker_id, status = %status, "Transaction status checked");
        Ok(status)
    }
}
