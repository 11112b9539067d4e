use std::sync::Arc;

use axum::{
    extract::Extension,
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
    Router::new().route("/", post(register_unit).get(list_units))
}

pub async fn register_unit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateUnitRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, Capability::ManageCatalog) {
        return resp;
    }

    match services.catalog().register_unit(body.into()).await {
        Ok(unit) => (StatusCode::CREATED, Json(unit)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_units(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, Capability::ViewStock) {
        return resp;
    }

    match services.catalog().list_units().await {
        Ok(units) => (StatusCode::OK, Json(units)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
