#![allow(dead_code)]

use async_trait::async_trait;
use p2p_frontend::config::Settings;
use p2p_frontend::models::{PaymentData, Transaction, TransactionData, TransactionStatus};
use p2p_frontend::services::{GatewayError, MemoryBlobStore, PaymentGateway};
use p2p_frontend::startup::build_state_with;
use p2p_frontend::AppState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-process payment backend. Created transactions start ACCEPTED; tests
/// move them along with [`StubGateway::set_status`].
#[derive(Default)]
pub struct StubGateway {
    statuses: Mutex<HashMap<String, TransactionStatus>>,
    next_id: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    reject_with: Mutex<Option<(u16, String)>>,
    status_delay: Mutex<Option<Duration>>,
}

impl StubGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_status(&self, tracker_id: &str, status: TransactionStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert(tracker_id.to_string(), status);
    }

    pub fn reject_next_create(&self, status: u16, message: &str) {
        *self.reject_with.lock().unwrap() = Some((status, message.to_string()));
    }

    /// Make every status check take `delay` before answering.
    pub fn delay_status_checks(&self, delay: Duration) {
        *self.status_delay.lock().unwrap() = Some(delay);
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_transaction(&self, data: &TransactionData) -> Result<Transaction, GatewayError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if let Some((status, message)) = self.reject_with.lock().unwrap().take() {
            return Err(GatewayError::Api { status, message });
        }

        let tracker_id = format!("trk_{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.set_status(&tracker_id, TransactionStatus::Accepted);

        Ok(Transaction {
            tracker_id,
            status: TransactionStatus::Accepted,
            payment_data: PaymentData {
                payment_method: data.sub_method.to_string(),
                payment_system: data.bank_token.clone(),
                payment_requisite: "4400 0000 0000 0000".to_string(),
                payment_holder: "IVAN IVANOV".to_string(),
                payment_expires_at: "2026-10-19T12:00:00Z".to_string(),
                qr_code_encoded: None,
                pay_link: None,
            },
            amount: data.amount,
            currency: data.currency.to_string(),
            amount_to_pay: data.amount,
        })
    }

    async fn check_transaction_status(
        &self,
        tracker_id: &str,
    ) -> Result<TransactionStatus, GatewayError> {
        let delay = *self.status_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .get(tracker_id)
            .copied()
            .ok_or_else(|| GatewayError::Api {
                status: 404,
                message: "Transaction not found".to_string(),
            })
    }
}

/// Settings with an in-memory store and the given polling scope.
pub fn test_settings(base_url: &str, polling_scope: &str) -> Settings {
    let yaml = format!(
        r#"
server:
  host: 127.0.0.1
  port: 0
gateway:
  base_url: {base_url}
  public_key: test_public_key
  private_key: test_private_key
  timeout_seconds: 5
store:
  backend: memory
polling:
  interval_seconds: 1
  scope: {polling_scope}
"#
    );

    config::Config::builder()
        .add_source(config::File::from_str(&yaml, config::FileFormat::Yaml))
        .build()
        .expect("Failed to build test settings")
        .try_deserialize()
        .expect("Failed to deserialize test settings")
}

pub fn test_state(gateway: Arc<StubGateway>, polling_scope: &str) -> AppState {
    let settings = test_settings("http://gateway.invalid", polling_scope);
    build_state_with(&settings, gateway, Arc::new(MemoryBlobStore::new()))
}

pub fn kzt_card_request(amount: f64) -> TransactionData {
    TransactionData {
        currency: p2p_frontend::models::Currency::Kzt,
        sub_method: p2p_frontend::models::PaymentMethod::Card,
        bank_token: "ANY".to_string(),
        amount,
    }
}
