use crate::models::catalog::{self, CatalogEntry, Currency, PaymentMethod, Selection};
use askama::Template;
use axum::{extract::Query, response::IntoResponse, Json};
use p2p_core::error::AppError;
use serde::Deserialize;

/// Method and bank selects, re-rendered whenever currency or method changes.
#[derive(Template)]
#[template(path = "partials/selector.html")]
pub struct SelectorTemplate {
    pub method: String,
    pub bank: String,
    pub methods: Vec<String>,
    pub banks: Vec<String>,
}

impl From<&Selection> for SelectorTemplate {
    fn from(selection: &Selection) -> Self {
        Self {
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
        }
    }
}

#[derive(Deserialize)]
pub struct SelectorParams {
    pub currency: Option<String>,
    pub method: Option<String>,
}

/// Resolve the selection a client lands on after choosing `currency`
/// and then `method`. An unoffered method keeps the currency's fallback.
pub fn resolve_selection(params: &SelectorParams) -> Result<Selection, AppError> {
    let mut selection = Selection::default();

    if let Some(currency) = params.currency.as_deref().filter(|c| !c.is_empty()) {
        let currency: Currency = currency
            .parse()
            .map_err(|e| AppError::BadRequest(anyhow::Error::new(e)))?;
        selection.select_currency(currency);
    }

    if let Some(method) = params.method.as_deref().filter(|m| !m.is_empty()) {
        let method: PaymentMethod = method
            .parse()
            .map_err(|e| AppError::BadRequest(anyhow::Error::new(e)))?;
        if let Err(e) = selection.select_method(method) {
            tracing::debug!(error = %e, "Keeping fallback method");
        }
    }

    Ok(selection)
}

pub async fn selector_fragment(
    Query(params): Query<SelectorParams>,
) -> Result<impl IntoResponse, AppError> {
    let selection = resolve_selection(&params)?;
    Ok(SelectorTemplate::from(&selection))
}

pub async fn catalog_json() -> Json<Vec<CatalogEntry>> {
    Json(catalog::entries())
}

pub async fn selection_json(
    Query(params): Query<SelectorParams>,
) -> Result<Json<Selection>, AppError> {
    Ok(Json(resolve_selection(&params)?))
}
