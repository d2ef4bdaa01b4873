use crate::handlers::transactions::{error_fragment, TransactionView};
use crate::models::{Currency, Selection};
use crate::AppState;
use askama::Template;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub currencies: Vec<String>,
    pub currency: String,
    pub method: String,
    pub bank: String,
    pub methods: Vec<String>,
    pub banks: Vec<String>,
    pub transactions: Vec<TransactionView>,
    pub poll_seconds: u64,
}

pub async fn index(State(state): State<AppState>) -> Response {
    let records = match state.transactions.list().await {
        Ok(records) => records,
        Err(e) => return error_fragment(e.into()),
    };

    let selection = Selection::default();
    IndexTemplate {
        currencies: Currency::ALL.iter().map(|c| c.to_string()).collect(),
        currency: selection.currency.to_string(),
        method: selection.method.to_string(),
        bank: selection.bank.clone(),
        methods: selection
            .available_methods()
            .iter()
            .map(|m| m.to_string())
            .collect(),
        banks: selection
            .available_banks()
            .iter()
            .map(|b| b.to_string())
            .collect(),
        transactions: records.iter().map(TransactionView::from).collect(),
        poll_seconds: state.poll_interval().as_secs(),
    }
    .into_response()
}

pub async fn health_check() -> &'static str {
    "OK"
}
