use crate::error::WalletError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request payload: {0}")]
    InvalidPayload(#[from] JsonRejection),
    #[error("invalid uuid: {0}")]
    InvalidUuid(#[from] uuid::Error),
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

/// JSON error body: `{"error": "...", "detail": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidPayload(_) | Self::InvalidUuid(_) => StatusCode::BAD_REQUEST,
            Self::Wallet(err) => match err {
                WalletError::InsufficientFunds { .. }
                | WalletError::UnknownOperation(_)
                | WalletError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
                WalletError::BalanceOverflow(_) => StatusCode::UNPROCESSABLE_ENTITY,
                WalletError::QueueFull(_) => StatusCode::TOO_MANY_REQUESTS,
                WalletError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
                WalletError::StorageTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                WalletError::Storage(_)
                | WalletError::ShutdownTimeout { .. }
                | WalletError::WorkerStopped(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn body(&self) -> ErrorResponse {
        let (error, detail) = match self {
            Self::InvalidPayload(rejection) => {
                ("invalid request payload", Some(rejection.body_text()))
            }
            Self::InvalidUuid(_) => ("invalid uuid", None),
            Self::Wallet(err) => match err {
                WalletError::InsufficientFunds { .. } => ("insufficient funds", None),
                WalletError::UnknownOperation(_) | WalletError::InvalidAmount(_) => {
                    ("invalid request payload", Some(err.to_string()))
                }
                WalletError::BalanceOverflow(_) => ("balance overflow", None),
                WalletError::QueueFull(_) => ("too many requests", None),
                WalletError::ShuttingDown => ("service is shutting down", None),
                WalletError::StorageTimeout(_) => ("storage timeout", Some(err.to_string())),
                _ => ("internal error", Some(err.to_string())),
            },
        };
        ErrorResponse { error, detail }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        (status, Json(self.body())).into_response()
    }
}
