use axum::http::StatusCode;
use tracing::error;

use crate::store::StoreError;

/// Handler rejection: status plus the raw message clients show to the user.
pub type ApiError = (StatusCode, String);

pub type ApiResult<T> = Result<T, ApiError>;

pub fn bad_request(msg: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, msg.into())
}

pub fn store_error(e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound => (StatusCode::NOT_FOUND, "Not found".into()),
        StoreError::DuplicateEmail | StoreError::Conflict => {
            (StatusCode::CONFLICT, e.to_string())
        }
        StoreError::Malformed(_) | StoreError::Database(_) => {
            error!(error = %e, "store failure");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
