use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use patrimonio_auth::Capability;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/", post(create_movement).get(list_movements))
}

pub async fn create_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateMovementRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, Capability::MoveStock) {
        return resp;
    }

    let request = match body.into_request(principal.user_id()) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match services.processor().process(request).await {
        Ok(movement) => (StatusCode::CREATED, Json(movement)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::MovementHistoryQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, Capability::ViewStock) {
        return resp;
    }

    let (filter, pagination) = match query.into_filter() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog().movement_history(&filter, pagination).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
