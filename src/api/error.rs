use crate::application::{catalog::CatalogError, inventory::InventoryError};
use crate::ports::StoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub enum ApiError {
    Inventory(InventoryError),
    Catalog(CatalogError),
    /// 利用者IDがない、または不正
    Unauthenticated,
    /// 権限不足
    Forbidden,
    /// リクエストの形式が不正
    BadRequest(String),
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        ApiError::Inventory(err)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

/// ストアのエラーを503/500に振り分ける
///
/// 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
fn store_failure(err: &StoreError) -> (StatusCode, &'static str, String) {
    match err {
        StoreError::Conflict | StoreError::Unavailable(_) => {
            tracing::error!(error = ?err, "storage unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORAGE_UNAVAILABLE",
                "Storage is temporarily unavailable".to_string(),
            )
        }
        StoreError::InvalidRecord(_) | StoreError::Backend(_) => {
            tracing::error!(error = ?err, "storage error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                "An unexpected error occurred".to_string(),
            )
        }
    }
}

fn transient_failure(attempts: u32) -> (StatusCode, &'static str, String) {
    tracing::warn!(attempts, "request failed after repeated conflicts");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        "TRANSIENT_FAILURE",
        "The request conflicted with concurrent updates, please retry".to_string(),
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            // 404 Not Found - リクエストされたリソースが存在しない
            ApiError::Inventory(InventoryError::TitleNotFound(_))
            | ApiError::Catalog(CatalogError::TitleNotFound(_)) => {
                (StatusCode::NOT_FOUND, "TITLE_NOT_FOUND", self.message())
            }
            ApiError::Inventory(InventoryError::LoanNotFound(_)) => {
                (StatusCode::NOT_FOUND, "LOAN_NOT_FOUND", self.message())
            }

            // 409 Conflict - 現在の状態では受け付けられない（想定内の業務結果）
            ApiError::Inventory(InventoryError::OutOfStock(_)) => {
                (StatusCode::CONFLICT, "OUT_OF_STOCK", self.message())
            }
            ApiError::Inventory(InventoryError::AlreadyReturned(_)) => {
                (StatusCode::CONFLICT, "ALREADY_RETURNED", self.message())
            }
            ApiError::Catalog(CatalogError::BelowOutstanding { .. }) => {
                (StatusCode::CONFLICT, "BELOW_OUTSTANDING", self.message())
            }
            ApiError::Catalog(CatalogError::HasActiveLoans { .. }) => {
                (StatusCode::CONFLICT, "HAS_ACTIVE_LOANS", self.message())
            }

            // 400 / 401 / 403
            ApiError::Catalog(CatalogError::InvalidTitle(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_TITLE", self.message())
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", self.message()),
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "Missing or invalid patron credentials".to_string(),
            ),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Not allowed for this patron".to_string(),
            ),

            // 503 / 500 - システム障害
            ApiError::Inventory(InventoryError::TransientFailure { attempts })
            | ApiError::Catalog(CatalogError::TransientFailure { attempts }) => {
                transient_failure(*attempts)
            }
            ApiError::Inventory(InventoryError::Store(e))
            | ApiError::Catalog(CatalogError::Store(e)) => store_failure(e),
            ApiError::Inventory(InventoryError::DueDateOutOfRange { requested_at }) => {
                tracing::error!(%requested_at, "loan period pushes the due date out of range");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INVALID_LOAN_PERIOD",
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}

impl ApiError {
    fn message(&self) -> String {
        match self {
            ApiError::Inventory(e) => e.to_string(),
            ApiError::Catalog(e) => e.to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Unauthenticated => "Unauthenticated".to_string(),
            ApiError::Forbidden => "Forbidden".to_string(),
        }
    }
}
