use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use patrimonio_auth::SessionError;
use patrimonio_infra::{ServiceError, StoreError};

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        ServiceError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        ServiceError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        ServiceError::UnsupportedTransition(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "unsupported_transition", msg)
        }
        ServiceError::Store(e) => store_failure(e),
    }
}

pub fn session_error_to_response(err: SessionError) -> axum::response::Response {
    match err {
        SessionError::MalformedToken | SessionError::Unknown | SessionError::Expired => {
            json_error(StatusCode::UNAUTHORIZED, "unauthenticated", err.to_string())
        }
        SessionError::InvalidTtl | SessionError::Storage(_) => {
            error!(error = %err, "session store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "session_error", err.to_string())
        }
    }
}

fn store_failure(err: StoreError) -> axum::response::Response {
    error!(error = %err, "store failure");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
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

/// 400 for a path or query parameter that does not parse.
pub fn invalid_param(name: &str, raw: &str) -> axum::response::Response {
    json_error(
        StatusCode::BAD_REQUEST,
        "invalid_id",
        format!("invalid {name}: '{raw}'"),
    )
}
