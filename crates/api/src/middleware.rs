use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use patrimonio_auth::{SessionError, SessionStore, SessionToken};

use crate::app::errors;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub sessions: Arc<dyn SessionStore>,
}

/// Resolve the bearer token to a live session and attach the principal.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token: SessionToken = extract_bearer(req.headers())
        .ok_or_else(|| errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "missing bearer token"))?
        .parse()
        .map_err(|e: SessionError| errors::session_error_to_response(e))?;

    let principal = state
        .sessions
        .resolve(&token, Utc::now())
        .map_err(errors::session_error_to_response)?;

    req.extensions_mut().insert(PrincipalContext::new(principal, token));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}
