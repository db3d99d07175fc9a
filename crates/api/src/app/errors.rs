use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockroom_infra::ServiceError;
use stockroom_stock::StockError;

/// Map an orchestration failure to a transport response.
///
/// Business-rule rejections carry the domain message (requested vs.
/// available amounts) straight through — callers get the diagnostics, not
/// a generic failure string.
pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::NotFound => {
            json_error(StatusCode::NOT_FOUND, "not_found", "stock record not found")
        }
        ServiceError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        ServiceError::Stock(e) => stock_error_to_response(e),
        ServiceError::Store(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
        ServiceError::Publish(msg) => json_error(StatusCode::BAD_GATEWAY, "publish_error", msg),
    }
}

fn stock_error_to_response(err: StockError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        // Should-never-happen consistency failure: a server fault, not a
        // caller mistake.
        StockError::IntegrityViolation(_) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "integrity_violation",
            message,
        ),
        StockError::InsufficientStock { .. } => {
            json_error(StatusCode::BAD_REQUEST, "insufficient_stock", message)
        }
        StockError::InvalidTransition(_) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_transition", message)
        }
        StockError::Quantity(_) => json_error(StatusCode::BAD_REQUEST, "invalid_quantity", message),
        StockError::Validation(_) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", message)
        }
        StockError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", message),
    }
}

/// 400 with the offending value-level message (request parsing).
pub fn bad_request(err: impl core::fmt::Display) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_request", err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
