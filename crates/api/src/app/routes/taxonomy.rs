use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use patrimonio_auth::Capability;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_taxonomy))
        .route("/categories", post(create_category))
        .route("/types", post(create_equipment_type))
        .route("/brands", post(create_brand))
        .route("/conditions", post(create_condition))
}

/// Every classification table in one document.
pub async fn get_taxonomy(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, Capability::ViewStock) {
        return resp;
    }

    match services.catalog().taxonomy().await {
        Ok(taxonomy) => (StatusCode::OK, Json(taxonomy)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateCategoryRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, Capability::ManageCatalog) {
        return resp;
    }

    match services.catalog().register_category(body.into()).await {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_equipment_type(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateEquipmentTypeRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, Capability::ManageCatalog) {
        return resp;
    }

    match services.catalog().register_equipment_type(body.into()).await {
        Ok(kind) => (StatusCode::CREATED, Json(kind)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_brand(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateNamedRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, Capability::ManageCatalog) {
        return resp;
    }

    match services.catalog().register_brand(body.into()).await {
        Ok(brand) => (StatusCode::CREATED, Json(brand)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_condition(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateNamedRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, Capability::ManageCatalog) {
        return resp;
    }

    match services.catalog().register_condition(body.into()).await {
        Ok(condition) => (StatusCode::CREATED, Json(condition)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
