//! Stock ledger domain.
//!
//! Business rules for movements between units and for reconciling stored
//! balances against the ledger, implemented as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod audit;
pub mod catalog;
pub mod movement;
pub mod taxonomy;

pub use audit::{
    ProductAudit, TrackingKind, UnitNames, UnitReconciliation, ledger_balances, reconcile_bulk,
    reconcile_product, reconcile_serialized,
};
pub use catalog::{
    Acquisition, Item, ItemStatus, NewItem, NewProduct, NewUnit, Product, Stock, Unit, low_stock,
};
pub use movement::{
    ItemUpdate, Movement, MovementContext, MovementKind, MovementPlan, MovementRequest,
    NewMovement, StockCredit, StockDebit, plan_movement,
};
pub use taxonomy::{
    Brand, Category, Condition, EquipmentType, NewBrand, NewCategory, NewCondition, NewEquipmentType,
    Taxonomy,
};
