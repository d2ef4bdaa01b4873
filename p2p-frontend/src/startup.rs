use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use p2p_core::middleware::{metrics_middleware, request_id_middleware, REQUEST_ID_HEADER};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::{PollingScope, Settings, StoreBackend};
use crate::handlers::{
    app::{health_check, index},
    catalog::{catalog_json, selection_json, selector_fragment},
    transactions::{
        check_transaction_status, create_transaction, create_transaction_form, get_transaction,
        list_transactions, refresh_status_fragment, transaction_details_fragment,
        transaction_list_fragment,
    },
};
use crate::services::{
    BlobStore, FileBlobStore, GatewayClient, MemoryBlobStore, PaymentGateway, PollTarget,
    PollerHandle, RedisBlobStore, StatusPoller, TransactionService, TransactionStore,
};
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/metrics", get(crate::handlers::metrics::metrics))
        // HTMX fragments
        .route("/catalog/selector", get(selector_fragment))
        .route("/transactions", post(create_transaction_form))
        .route("/transactions/list", get(transaction_list_fragment))
        .route("/transactions/:tracker_id", get(transaction_details_fragment))
        .route(
            "/transactions/:tracker_id/refresh",
            post(refresh_status_fragment),
        )
        // JSON API
        .route("/api/catalog", get(catalog_json))
        .route("/api/catalog/selection", get(selection_json))
        .route(
            "/api/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route("/api/transactions/:tracker_id", get(get_transaction))
        .route(
            "/api/transactions/:tracker_id/status",
            post(check_transaction_status),
        )
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        // Outermost, so the trace span sees the request id
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Open the configured history backend.
pub async fn build_blob_store(settings: &Settings) -> anyhow::Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match settings.store.backend {
        StoreBackend::Memory => Arc::new(MemoryBlobStore::new()),
        StoreBackend::File => Arc::new(FileBlobStore::new(settings.store.data_dir.clone())),
        StoreBackend::Redis => {
            let url = settings
                .store
                .redis_url
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("store.redis_url is required for the redis backend"))?;
            Arc::new(RedisBlobStore::connect(url.expose_secret()).await?)
        }
    };

    tracing::info!(backend = ?settings.store.backend, key = %settings.store.key, "Transaction store ready");
    Ok(store)
}

/// Wire the application state around an existing gateway. Tests pass a stub here.
pub fn build_state_with(
    settings: &Settings,
    gateway: Arc<dyn PaymentGateway>,
    blobs: Arc<dyn BlobStore>,
) -> AppState {
    let store = Arc::new(TransactionStore::new(blobs, settings.store.key.clone()));
    let service = Arc::new(TransactionService::new(gateway, store));
    AppState::new(service, settings.polling.clone())
}

pub async fn build_state(settings: &Settings) -> anyhow::Result<AppState> {
    let gateway = Arc::new(GatewayClient::new(settings.gateway.clone())?);
    let blobs = build_blob_store(settings).await?;
    Ok(build_state_with(settings, gateway, blobs))
}

/// Start the process-wide poller when polling covers every pending record.
pub fn spawn_background_polling(state: &AppState) -> Option<PollerHandle> {
    match state.polling.scope {
        PollingScope::AllPending => Some(StatusPoller::spawn(
            state.transactions.clone(),
            PollTarget::AllPending,
            state.poll_interval(),
        )),
        PollingScope::Latest | PollingScope::None => None,
    }
}
