use axum::http::{Method, Uri};
use backupgate_core::AppError;

use crate::error::ApiError;

/// Answers requests no route accepts.
///
/// Methods outside GET, POST and DELETE are refused with 405; anything else is 404.
pub async fn unmatched_request_handler(method: Method, uri: Uri) -> ApiError {
    if method != Method::GET && method != Method::POST && method != Method::DELETE {
        return ApiError(AppError::MethodNotAllowed(format!(
            "received {method} method in HTTP request. Only POST, GET and DELETE are allowed."
        )));
    }

    ApiError(AppError::NotFound(format!(
        "resource not found: {}",
        uri.path()
    )))
}
