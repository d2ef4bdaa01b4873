use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Conflict: {0}")]
    Conflict(anyhow::Error),

    /// The payment backend rejected the call. `message` is what it said.
    #[error("Upstream rejected request ({status}): {message}")]
    UpstreamRejected { status: u16, message: String },

    #[error("Bad Gateway: {0}")]
    BadGateway(String),

    #[error("Storage error: {0}")]
    StorageError(anyhow::Error),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::StorageError(anyhow::Error::new(err))
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::UpstreamRejected { .. } | AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::StorageError(_) | AppError::InternalError(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message that is safe to show to an end user.
    pub fn user_message(&self) -> String {
        match self {
            AppError::ValidationError(err) => format!("Invalid input: {}", err),
            AppError::BadRequest(err) | AppError::NotFound(err) | AppError::Conflict(err) => {
                err.to_string()
            }
            AppError::UpstreamRejected { message, .. } => message.clone(),
            AppError::BadGateway(msg) => format!("Payment service unavailable: {}", msg),
            AppError::StorageError(_) => "Transaction history is unavailable".to_string(),
            AppError::InternalError(_) | AppError::ConfigError(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let status = self.status_code();

        let details = match &self {
            AppError::ValidationError(err) => Some(err.to_string()),
            AppError::UpstreamRejected { status, .. } => Some(format!("upstream status {}", status)),
            AppError::StorageError(err) => Some(err.to_string()),
            AppError::InternalError(err) => Some(format!("{:#?}", err)),
            AppError::ConfigError(err) => Some(err.to_string()),
            _ => None,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.user_message(),
                details,
            }),
        )
            .into_response()
    }
}
