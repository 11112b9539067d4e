//! API-side capability guard.
//!
//! Checked at the route boundary, before any service call, so the domain and
//! infra crates stay auth-agnostic.

use axum::http::StatusCode;
use axum::response::Response;
use tracing::warn;

use patrimonio_auth::{Capability, authorize};

use crate::app::errors;
use crate::context::PrincipalContext;

/// Require `capability` for the current request; 403 otherwise.
pub fn require(principal: &PrincipalContext, capability: Capability) -> Result<(), Response> {
    authorize(principal.principal(), capability).map_err(|e| {
        warn!(
            user_id = %principal.user_id(),
            role = %principal.role(),
            capability = %capability,
            "capability check failed"
        );
        errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
    })
}
