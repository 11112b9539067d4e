//! Balance store boundary.
//!
//! Persists units, the classification tables, products, items, per-unit
//! stock balances and the append-only movement ledger. Balances change only through
//! [`InventoryStore::commit_movement`], which applies a whole
//! [`MovementPlan`] or nothing.

pub mod in_memory;
pub mod postgres;
pub mod query;

use std::sync::Arc;

use thiserror::Error;

use patrimonio_core::{ItemId, ProductId, UnitId};
use patrimonio_inventory::{
    Brand, Category, Condition, EquipmentType, Item, Movement, MovementPlan, NewBrand, NewCategory,
    NewCondition, NewEquipmentType, NewItem, NewProduct, NewUnit, Product, Stock, Taxonomy, Unit,
};

pub use in_memory::InMemoryInventoryStore;
pub use postgres::PostgresInventoryStore;
pub use query::{MovementFilter, MovementPage, Pagination};

/// Store operation error.
///
/// Constraint failures surface as `NotFound` / `Conflict` so callers can map
/// them like domain rejections; everything else is `Backend`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A referenced record does not exist (foreign key).
    #[error("referenced record not found: {0}")]
    NotFound(String),

    /// Uniqueness violation, a conditioned update that matched nothing, or a
    /// balance that would go negative.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

#[async_trait::async_trait]
pub trait InventoryStore: Send + Sync {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError>;

    async fn get_unit(&self, id: UnitId) -> Result<Option<Unit>, StoreError>;

    async fn get_stock(&self, product_id: ProductId, unit_id: UnitId) -> Result<Option<Stock>, StoreError>;

    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    async fn list_units(&self) -> Result<Vec<Unit>, StoreError>;

    async fn list_stocks(&self) -> Result<Vec<Stock>, StoreError>;

    async fn list_stocks_for_product(&self, product_id: ProductId) -> Result<Vec<Stock>, StoreError>;

    async fn list_items_for_product(&self, product_id: ProductId) -> Result<Vec<Item>, StoreError>;

    /// Filtered ledger page, newest first.
    async fn list_movements(
        &self,
        filter: &MovementFilter,
        pagination: Pagination,
    ) -> Result<MovementPage, StoreError>;

    /// Full ledger of one product in commit order.
    async fn movements_for_product(&self, product_id: ProductId) -> Result<Vec<Movement>, StoreError>;

    /// Every classification table, each ordered by id.
    async fn taxonomy(&self) -> Result<Taxonomy, StoreError>;

    async fn insert_unit(&self, unit: NewUnit) -> Result<Unit, StoreError>;

    /// Reference names are unique within their table.
    async fn insert_category(&self, category: NewCategory) -> Result<Category, StoreError>;

    /// Fails with `NotFound` when the parent category does not exist.
    async fn insert_equipment_type(&self, kind: NewEquipmentType) -> Result<EquipmentType, StoreError>;

    async fn insert_brand(&self, brand: NewBrand) -> Result<Brand, StoreError>;

    async fn insert_condition(&self, condition: NewCondition) -> Result<Condition, StoreError>;

    /// Fails with `NotFound` when a referenced category, type or brand is missing.
    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError>;

    /// Items start `Disponível`. Serial numbers are unique.
    async fn insert_item(&self, item: NewItem) -> Result<Item, StoreError>;

    /// Apply every mutation of `plan` and append its ledger entry atomically.
    ///
    /// Implementations must re-check the debit ("decrement only if quantity is
    /// still sufficient") and the item's expected location at commit time and
    /// fail with `Conflict` without applying anything if either no longer holds.
    async fn commit_movement(&self, plan: &MovementPlan) -> Result<Movement, StoreError>;
}

#[async_trait::async_trait]
impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).get_product(id).await
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        (**self).get_item(id).await
    }

    async fn get_unit(&self, id: UnitId) -> Result<Option<Unit>, StoreError> {
        (**self).get_unit(id).await
    }

    async fn get_stock(&self, product_id: ProductId, unit_id: UnitId) -> Result<Option<Stock>, StoreError> {
        (**self).get_stock(product_id, unit_id).await
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        (**self).list_products().await
    }

    async fn list_units(&self) -> Result<Vec<Unit>, StoreError> {
        (**self).list_units().await
    }

    async fn list_stocks(&self) -> Result<Vec<Stock>, StoreError> {
        (**self).list_stocks().await
    }

    async fn list_stocks_for_product(&self, product_id: ProductId) -> Result<Vec<Stock>, StoreError> {
        (**self).list_stocks_for_product(product_id).await
    }

    async fn list_items_for_product(&self, product_id: ProductId) -> Result<Vec<Item>, StoreError> {
        (**self).list_items_for_product(product_id).await
    }

    async fn list_movements(
        &self,
        filter: &MovementFilter,
        pagination: Pagination,
    ) -> Result<MovementPage, StoreError> {
        (**self).list_movements(filter, pagination).await
    }

    async fn movements_for_product(&self, product_id: ProductId) -> Result<Vec<Movement>, StoreError> {
        (**self).movements_for_product(product_id).await
    }

    async fn taxonomy(&self) -> Result<Taxonomy, StoreError> {
        (**self).taxonomy().await
    }

    async fn insert_unit(&self, unit: NewUnit) -> Result<Unit, StoreError> {
        (**self).insert_unit(unit).await
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Category, StoreError> {
        (**self).insert_category(category).await
    }

    async fn insert_equipment_type(&self, kind: NewEquipmentType) -> Result<EquipmentType, StoreError> {
        (**self).insert_equipment_type(kind).await
    }

    async fn insert_brand(&self, brand: NewBrand) -> Result<Brand, StoreError> {
        (**self).insert_brand(brand).await
    }

    async fn insert_condition(&self, condition: NewCondition) -> Result<Condition, StoreError> {
        (**self).insert_condition(condition).await
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        (**self).insert_product(product).await
    }

    async fn insert_item(&self, item: NewItem) -> Result<Item, StoreError> {
        (**self).insert_item(item).await
    }

    async fn commit_movement(&self, plan: &MovementPlan) -> Result<Movement, StoreError> {
        (**self).commit_movement(plan).await
    }
}
