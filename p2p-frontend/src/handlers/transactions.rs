use crate::models::{Currency, PaymentMethod, TransactionData, TransactionRecord, TransactionStatus};
use crate::services::ServiceError;
use crate::AppState;
use askama::Template;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use p2p_core::error::AppError;
use serde::Deserialize;

/// Event name the history list listens for to reload itself.
pub const TRANSACTIONS_CHANGED_EVENT: &str = "transactions-changed";

/// Display-ready copy of a stored transaction.
#[derive(Debug, Clone)]
pub struct TransactionView {
    pub tracker_id: String,
    pub status: String,
    pub status_class: &'static str,
    pub is_pending: bool,
    pub payment_method: String,
    pub payment_system: String,
    pub payment_requisite: String,
    pub payment_holder: String,
    pub expires_at: String,
    pub amount_to_pay: String,
    pub currency: String,
    pub qr_code: String,
    pub pay_link: String,
    pub response_time: u64,
}

impl From<&TransactionRecord> for TransactionView {
    fn from(record: &TransactionRecord) -> Self {
        let tx = &record.transaction;
        let status_class = match tx.status {
            TransactionStatus::Success => "status-success",
            TransactionStatus::Declined => "status-declined",
            TransactionStatus::Accepted => "status-pending",
        };

        Self {
            tracker_id: tx.tracker_id.clone(),
            status: tx.status.to_string(),
            status_class,
            is_pending: !tx.status.is_terminal(),
            payment_method: tx.payment_data.payment_method.clone(),
            payment_system: tx.payment_data.payment_system.clone(),
            payment_requisite: tx.payment_data.payment_requisite.clone(),
            payment_holder: tx.payment_data.payment_holder.clone(),
            expires_at: format_expiry(&tx.payment_data.payment_expires_at),
            amount_to_pay: format_amount(tx.amount_to_pay),
            currency: tx.currency.clone(),
            qr_code: tx.payment_data.qr_code_encoded.clone().unwrap_or_default(),
            pay_link: tx.payment_data.pay_link.clone().unwrap_or_default(),
            response_time: record.response_time,
        }
    }
}

fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{}", amount as i64)
    } else {
        format!("{}", amount)
    }
}

/// Server timestamps are shown in UTC; anything unparseable is shown as sent.
fn format_expiry(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|t| {
            t.with_timezone(&chrono::Utc)
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string()
        })
        .unwrap_or_else(|_| raw.to_string())
}

#[derive(Template)]
#[template(path = "partials/transaction_list.html")]
pub struct TransactionListTemplate {
    pub transactions: Vec<TransactionView>,
}

#[derive(Template)]
#[template(path = "partials/transaction_details.html")]
pub struct TransactionDetailsTemplate {
    pub tx: TransactionView,
}

#[derive(Template)]
#[template(path = "partials/error.html")]
pub struct ErrorTemplate {
    pub message: String,
}

/// Form fields as posted by the browser; everything arrives as text.
#[derive(Deserialize)]
pub struct CreateTransactionForm {
    pub currency: String,
    pub method: String,
    pub bank: String,
    pub amount: String,
}

impl TryFrom<CreateTransactionForm> for TransactionData {
    type Error = AppError;

    fn try_from(form: CreateTransactionForm) -> Result<Self, Self::Error> {
        let currency: Currency = form
            .currency
            .parse()
            .map_err(|e| AppError::BadRequest(anyhow::Error::new(e)))?;
        let sub_method: PaymentMethod = form
            .method
            .parse()
            .map_err(|e| AppError::BadRequest(anyhow::Error::new(e)))?;
        let amount: f64 = form
            .amount
            .trim()
            .parse()
            .ok()
            .filter(|amount: &f64| amount.is_finite())
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Amount must be a number")))?;

        Ok(TransactionData {
            currency,
            sub_method,
            bank_token: form.bank.trim().to_string(),
            amount,
        })
    }
}

/// Render an error as an HTML fragment, keeping the error's status code.
pub fn error_fragment(err: AppError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!(error = %err, "Transaction request failed");
    } else {
        tracing::warn!(error = %err, "Transaction request rejected");
    }

    (
        status,
        ErrorTemplate {
            message: err.user_message(),
        },
    )
        .into_response()
}

fn changed_trigger() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "HX-Trigger",
        HeaderValue::from_static(TRANSACTIONS_CHANGED_EVENT),
    );
    headers
}

pub async fn create_transaction_form(
    State(state): State<AppState>,
    Form(form): Form<CreateTransactionForm>,
) -> Response {
    let data = match TransactionData::try_from(form) {
        Ok(data) => data,
        Err(e) => return error_fragment(e),
    };

    match state.transactions.create_transaction(data).await {
        Ok(record) => {
            state.follow_latest(record.tracker_id()).await;
            (
                StatusCode::OK,
                changed_trigger(),
                TransactionDetailsTemplate {
                    tx: TransactionView::from(&record),
                },
            )
                .into_response()
        }
        Err(e) => error_fragment(e.into()),
    }
}

pub async fn transaction_list_fragment(State(state): State<AppState>) -> Response {
    match state.transactions.list().await {
        Ok(records) => TransactionListTemplate {
            transactions: records.iter().map(TransactionView::from).collect(),
        }
        .into_response(),
        Err(e) => error_fragment(e.into()),
    }
}

pub async fn transaction_details_fragment(
    State(state): State<AppState>,
    Path(tracker_id): Path<String>,
) -> Response {
    match state.transactions.get(&tracker_id).await {
        Ok(record) => TransactionDetailsTemplate {
            tx: TransactionView::from(&record),
        }
        .into_response(),
        Err(e) => error_fragment(e.into()),
    }
}

pub async fn refresh_status_fragment(
    State(state): State<AppState>,
    Path(tracker_id): Path<String>,
) -> Response {
    match refresh_and_get(&state, &tracker_id).await {
        Ok(record) => (
            StatusCode::OK,
            changed_trigger(),
            TransactionDetailsTemplate {
                tx: TransactionView::from(&record),
            },
        )
            .into_response(),
        Err(e) => error_fragment(e.into()),
    }
}

/// Re-check a stored transaction with the backend and return the stored
/// record afterwards. Unknown ids fail before any backend call.
async fn refresh_and_get(
    state: &AppState,
    tracker_id: &str,
) -> Result<TransactionRecord, ServiceError> {
    state.transactions.get(tracker_id).await?;
    state.transactions.refresh_status(tracker_id).await?;
    state.transactions.get(tracker_id).await
}

pub async fn list_transactions(
    State(state): State<AppState>,
) -> Result<Json<Vec<TransactionRecord>>, AppError> {
    Ok(Json(state.transactions.list().await?))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    Json(data): Json<TransactionData>,
) -> Result<(StatusCode, Json<TransactionRecord>), AppError> {
    let record = state.transactions.create_transaction(data).await?;
    state.follow_latest(record.tracker_id()).await;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(tracker_id): Path<String>,
) -> Result<Json<TransactionRecord>, AppError> {
    Ok(Json(state.transactions.get(&tracker_id).await?))
}

pub async fn check_transaction_status(
    State(state): State<AppState>,
    Path(tracker_id): Path<String>,
) -> Result<Json<TransactionRecord>, AppError> {
    Ok(Json(refresh_and_get(&state, &tracker_id).await?))
}
