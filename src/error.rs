//! Application error type and the JSON error body shared by all routes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Error response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profiles_count: Option<i64>,
}

/// Every variant carries the user-facing (Vietnamese) message; technical
/// detail for `Internal` is logged and never serialized.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// `hint` is sent as the body's `message` field.
    #[error("{message}")]
    Conflict {
        message: String,
        hint: Option<String>,
        profiles_count: Option<i64>,
    },

    #[error("Cơ sở dữ liệu chưa sẵn sàng")]
    DatabaseUnavailable,

    #[error("{message}")]
    Internal { message: String, detail: String },
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            hint: None,
            profiles_count: None,
        }
    }

    pub fn internal(message: impl Into<String>, detail: impl ToString) -> Self {
        Self::Internal {
            message: message.into(),
            detail: detail.to_string(),
        }
    }

    /// Replace the user-facing message of an internal error, keeping its detail.
    pub fn context(self, message: impl Into<String>) -> Self {
        match self {
            Self::Internal { detail, .. } => Self::Internal {
                message: message.into(),
                detail,
            },
            other => other,
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::DatabaseUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            Self::Internal { message, detail } => {
                tracing::error!(status = %status, detail = %detail, "{}", message);
            }
            Self::DatabaseUnavailable => {
                tracing::error!(status = %status, "database pool not initialized");
            }
            other => {
                tracing::debug!(status = %status, error = %other, "client error");
            }
        }

        let (message, profiles_count) = match &self {
            Self::Conflict {
                hint,
                profiles_count,
                ..
            } => (hint.clone(), *profiles_count),
            _ => (None, None),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            message,
            profiles_count,
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Self::conflict("Dữ liệu đã tồn tại");
            }
        }
        Self::internal("Lỗi cơ sở dữ liệu", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::DatabaseUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::internal("x", "boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_detail_is_not_exposed() {
        let err = AppError::internal("Không thể tạo hồ sơ", "connection reset by peer");
        assert_eq!(err.to_string(), "Không thể tạo hồ sơ");
    }

    #[test]
    fn test_context_only_rewrites_internal() {
        let err = AppError::internal("Lỗi cơ sở dữ liệu", "timeout").context("Không thể xóa");
        assert_eq!(err.to_string(), "Không thể xóa");
        let err = AppError::not_found("Không tìm thấy").context("Không thể xóa");
        assert_eq!(err.to_string(), "Không tìm thấy");
    }

    #[tokio::test]
    async fn test_conflict_body_carries_profiles_count() {
        let err = AppError::Conflict {
            message: "Đang được sử dụng".to_string(),
            hint: Some("Hãy tắt đặc điểm thay vì xóa".to_string()),
            profiles_count: Some(3),
        };
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.profiles_count, Some(3));
        assert_eq!(body.error, "Đang được sử dụng");
        assert_eq!(body.message.as_deref(), Some("Hãy tắt đặc điểm thay vì xóa"));
    }

    #[tokio::test]
    async fn test_plain_errors_omit_optional_fields() {
        let res = AppError::conflict("Đặc điểm này đã tồn tại").into_response();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "Đặc điểm này đã tồn tại" }));
    }
}
