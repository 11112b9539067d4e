use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse};
use tracing::info;

use patrimonio_auth::SessionStore;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Revoke the session carried by the request.
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.sessions().revoke(&principal.token()) {
        Ok(_) => {
            info!(user_id = %principal.user_id(), "session revoked");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::session_error_to_response(e),
    }
}
