use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use zapgate_core::Error;

/// An engine error mapped onto an HTTP response.
///
/// Client-caused failures get a specific status; everything else collapses to
/// a generic 500 with the detail kept in the logs.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            Error::SessionInvalid => (StatusCode::UNAUTHORIZED, "invalid or missing session"),
            Error::NoMatchingChallenge => (StatusCode::UNAUTHORIZED, "no matching challenge"),
            Error::RefundWindowExpired => (StatusCode::FORBIDDEN, "refund window expired"),
            other => {
                tracing::error!(error = %other, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
