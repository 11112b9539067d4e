use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;

use patrimonio_auth::Capability;
use patrimonio_core::ProductId;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(audit_all))
        .route("/products/:id", get(audit_product))
}

/// Reconciliation report for every product.
pub async fn audit_all(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, Capability::GenerateStockReport) {
        return resp;
    }

    match services.audit().audit_all().await {
        Ok(reports) => {
            let divergent = reports.iter().filter(|r| r.has_divergence()).count();
            (
                StatusCode::OK,
                Json(json!({
                    "products": reports,
                    "divergent_products": divergent,
                })),
            )
                .into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn audit_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, Capability::GenerateStockReport) {
        return resp;
    }

    let product_id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_param("product id", &id),
    };

    match services.audit().audit_product(product_id).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
