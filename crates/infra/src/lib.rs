//! Infrastructure layer: balance store, movement pipeline, audit, config.

pub mod audit;
pub mod catalog;
pub mod config;
pub mod error;
pub mod processor;
pub mod store;

pub use audit::AuditService;
pub use catalog::{CatalogService, StockView};
pub use config::{AppConfig, ConfigError, DatabaseConfig};
pub use error::{MovementError, ServiceError};
pub use processor::MovementProcessor;
pub use store::{
    InMemoryInventoryStore, InventoryStore, MovementFilter, MovementPage, Pagination,
    PostgresInventoryStore, StoreError,
};
