//! Transaction history kept as one JSON array under a fixed key.
//!
//! Every mutation reads the whole blob, changes it and writes it back. A
//! mutex serialises mutations inside this process; writers in other
//! processes sharing the same key are last-writer-wins.

use crate::models::{TransactionRecord, TransactionStatus};
use crate::services::blob_store::{BlobStore, BlobStoreError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(#[from] BlobStoreError),

    #[error("Failed to serialize transaction history: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Transaction {0} is already stored")]
    DuplicateTracker(String),
}

pub struct TransactionStore {
    blobs: Arc<dyn BlobStore>,
    key: String,
    write_lock: Mutex<()>,
}

impl TransactionStore {
    pub fn new(blobs: Arc<dyn BlobStore>, key: impl Into<String>) -> Self {
        Self {
            blobs,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// All records in insertion order.
    ///
    /// A missing blob is an empty history. So is a blob that does not parse;
    /// that case is logged and the next write replaces it.
    pub async fn list(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        let Some(blob) = self.blobs.load(&self.key).await? else {
            return Ok(Vec::new());
        };

        if blob.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Vec<TransactionRecord>>(&blob) {
            Ok(records) => Ok(records),
            Err(e) => {
                tracing::warn!(
                    key = %self.key,
                    error = %e,
                    "Stored transaction history is malformed, treating as empty"
                );
                Ok(Vec::new())
            }
        }
    }

    pub async fn get(&self, tracker_id: &str) -> Result<Option<TransactionRecord>, StoreError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|r| r.tracker_id() == tracker_id))
    }

    /// Records still waiting for a final status.
    pub async fn pending(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|r| !r.status().is_terminal())
            .collect())
    }

    pub async fn append(&self, record: TransactionRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.list().await?;
        if records.iter().any(|r| r.tracker_id() == record.tracker_id()) {
            return Err(StoreError::DuplicateTracker(record.tracker_id().to_string()));
        }

        tracing::debug!(tracker_id = %record.tracker_id(), "Appending transaction record");
        records.push(record);
        self.write(&records).await
    }

    /// Apply a status reported by the backend.
    ///
    /// Returns the updated record, or `None` when nothing changed: unknown
    /// tracker, same status, or a record that is already final.
    pub async fn update_status(
        &self,
        tracker_id: &str,
        status: TransactionStatus,
        observed_at: DateTime<Utc>,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.list().await?;
        let Some(record) = records.iter_mut().find(|r| r.tracker_id() == tracker_id) else {
            tracing::debug!(tracker_id = %tracker_id, "Status update for unknown transaction");
            return Ok(None);
        };

        let current = record.status();
        if current == status {
            return Ok(None);
        }
        if !current.can_transition_to(status) {
            tracing::warn!(
                tracker_id = %tracker_id,
                from = %current,
                to = %status,
                "Ignoring status change for finalised transaction"
            );
            return Ok(None);
        }

        record.transaction.status = status;
        record.updated_at = observed_at;
        let updated = record.clone();

        self.write(&records).await?;
        tracing::info!(tracker_id = %tracker_id, from = %current, to = %status, "Transaction status updated");
        Ok(Some(updated))
    }

    async fn write(&self, records: &[TransactionRecord]) -> Result<(), StoreError> {
        let blob = serde_json::to_string(records)?;
        self.blobs.save(&self.key, blob).await?;
        Ok(())
    }
}
