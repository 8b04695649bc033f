//! Unified error handling for admin.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::{
    AccountError, ExportError, ImportError, PromptError, ValidationError,
};
use crate::store::StoreError;

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Identity API operation failed.
    #[error("Account error: {0}")]
    Account(AccountError),

    /// CSV import rejected or unreadable.
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Export request rejected or CSV generation failed.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(e) => Self::Validation(e),
            AccountError::Store(e) => Self::Store(e),
            other => Self::Account(other),
        }
    }
}

impl From<PromptError> for AppError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::Validation(e) => Self::Validation(e),
            PromptError::HistoryNotFound(id) => Self::NotFound(format!("prompt history {id}")),
            PromptError::Store(e) => Self::Store(e),
        }
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Store(StoreError::Unsupported(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(StoreError::NotFound(_)) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::AlreadyExists(_)) => StatusCode::CONFLICT,
            Self::Store(StoreError::InvalidPath(_))
            | Self::Validation(_)
            | Self::Import(_)
            | Self::Export(ExportError::NoItems | ExportError::InvalidRange { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Self::Account(AccountError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Account(AccountError::Identity { status, .. }) if *status < 500 => {
                StatusCode::BAD_REQUEST
            }
            Self::Store(_) | Self::Account(_) => StatusCode::BAD_GATEWAY,
            Self::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Export(_) if status.is_server_error() => {
                "Internal server error".to_string()
            }
            Self::Store(StoreError::Http(_) | StoreError::Api { .. } | StoreError::Parse(_))
            | Self::Account(AccountError::Http(_) | AccountError::Parse(_)) => {
                "External service error".to_string()
            }
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("users/u1".to_string());
        assert_eq!(err.to_string(), "Not found: users/u1");

        let err = AppError::from(ValidationError::Unchanged);
        assert_eq!(
            err.to_string(),
            "Validation error: New prompt is identical to the current one"
        );
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(StoreError::Unsupported("create").into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(
                StoreError::Api {
                    status: 500,
                    message: "boom".to_string()
                }
                .into()
            ),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(ImportError::MissingColumns(vec!["商品名".to_string()]).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(ExportError::NoItems.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(
                AccountError::Identity {
                    status: 400,
                    message: "EMAIL_EXISTS".to_string()
                }
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(PromptError::HistoryNotFound("h1".to_string()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(ExportError::Buffer("test".to_string()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
