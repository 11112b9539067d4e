use axum::{
    routing::{get, post},
    Router,
};

pub mod audit;
pub mod items;
pub mod movements;
pub mod products;
pub mod sessions;
pub mod stock;
pub mod system;
pub mod taxonomy;
pub mod units;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/sessions/logout", post(sessions::logout))
        .nest("/movements", movements::router())
        .nest("/audit", audit::router())
        .nest("/products", products::router())
        .nest("/items", items::router())
        .nest("/units", units::router())
        .nest("/stock", stock::router())
        .nest("/taxonomy", taxonomy::router())
}
