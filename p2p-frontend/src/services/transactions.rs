use crate::models::{catalog, SelectionError, TransactionData, TransactionRecord, TransactionStatus};
use crate::services::gateway_client::{GatewayError, PaymentGateway};
use crate::services::metrics;
use crate::services::transaction_store::{StoreError, TransactionStore};
use p2p_core::error::AppError;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use validator::Validate;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid transaction request: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Transaction {0} not found")]
    NotFound(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => AppError::ValidationError(e),
            ServiceError::Selection(e) => AppError::BadRequest(e.into()),
            ServiceError::NotFound(id) => {
                AppError::NotFound(anyhow::anyhow!("Transaction {} not found", id))
            }
            ServiceError::Gateway(GatewayError::Api { status, message }) => {
                AppError::UpstreamRejected { status, message }
            }
            ServiceError::Gateway(e) => AppError::BadGateway(e.to_string()),
            ServiceError::Store(StoreError::DuplicateTracker(id)) => {
                AppError::Conflict(anyhow::anyhow!("Transaction {} is already stored", id))
            }
            ServiceError::Store(e) => AppError::StorageError(e.into()),
        }
    }
}

/// Creates transactions through the gateway and keeps the local history in
/// step with what the gateway reports.
pub struct TransactionService {
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<TransactionStore>,
}

impl TransactionService {
    pub fn new(gateway: Arc<dyn PaymentGateway>, store: Arc<TransactionStore>) -> Self {
        Self { gateway, store }
    }

    /// Validate, submit and record a new transaction.
    ///
    /// The stored record carries the wall-clock time the response arrived
    /// and how long the backend took to answer.
    pub async fn create_transaction(
        &self,
        data: TransactionData,
    ) -> Result<TransactionRecord, ServiceError> {
        data.validate()?;
        catalog::validate(data.currency, data.sub_method, &data.bank_token)?;

        let started = Instant::now();
        let transaction = self.gateway.create_transaction(&data).await?;
        let response_time = started.elapsed().as_millis() as u64;

        let record = TransactionRecord::new(transaction, chrono::Utc::now(), response_time);
        self.store.append(record.clone()).await?;

        metrics::record_transaction_created(data.currency.as_str(), data.sub_method.as_str());
        tracing::info!(
            tracker_id = %record.tracker_id(),
            response_time_ms = response_time,
            "Transaction recorded"
        );

        Ok(record)
    }

    /// Ask the gateway for the current status and store it if it changed.
    ///
    /// Returns the status the gateway reported.
    pub async fn refresh_status(&self, tracker_id: &str) -> Result<TransactionStatus, ServiceError> {
        let status = self.gateway.check_transaction_status(tracker_id).await?;

        if let Some(updated) = self
            .store
            .update_status(tracker_id, status, chrono::Utc::now())
            .await?
        {
            metrics::record_status_change(updated.status().as_str());
        }

        Ok(status)
    }

    pub async fn list(&self) -> Result<Vec<TransactionRecord>, ServiceError> {
        Ok(self.store.list().await?)
    }

    pub async fn get(&self, tracker_id: &str) -> Result<TransactionRecord, ServiceError> {
        self.store
            .get(tracker_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(tracker_id.to_string()))
    }

    pub async fn pending(&self) -> Result<Vec<TransactionRecord>, ServiceError> {
        Ok(self.store.pending().await?)
    }
}
