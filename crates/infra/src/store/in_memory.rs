use std::collections::BTreeMap;
use std::sync::RwLock;

use patrimonio_core::{BrandId, CategoryId, ConditionId, EquipmentTypeId, ItemId, MovementId, ProductId, UnitId};
use patrimonio_inventory::{
    Brand, Category, Condition, EquipmentType, Item, ItemStatus, Movement, MovementPlan, NewBrand,
    NewCategory, NewCondition, NewEquipmentType, NewItem, NewProduct, NewUnit, Product, Stock, Taxonomy,
    Unit,
};

use super::query::{MovementFilter, MovementPage, Pagination};
use super::{InventoryStore, StoreError};

#[derive(Debug, Default)]
struct State {
    units: BTreeMap<UnitId, Unit>,
    categories: BTreeMap<CategoryId, Category>,
    equipment_types: BTreeMap<EquipmentTypeId, EquipmentType>,
    brands: BTreeMap<BrandId, Brand>,
    conditions: BTreeMap<ConditionId, Condition>,
    products: BTreeMap<ProductId, Product>,
    items: BTreeMap<ItemId, Item>,
    stocks: BTreeMap<(ProductId, UnitId), Stock>,
    movements: Vec<Movement>,
    last_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn require_unit(&self, id: UnitId) -> Result<(), StoreError> {
        if self.units.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("unit {id}")))
        }
    }

    fn require_product(&self, id: ProductId) -> Result<(), StoreError> {
        if self.products.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("product {id}")))
        }
    }

    /// Foreign keys of a product row.
    fn require_classification(&self, product: &NewProduct) -> Result<(), StoreError> {
        if let Some(id) = product.category_id.filter(|id| !self.categories.contains_key(id)) {
            return Err(StoreError::NotFound(format!("category {id}")));
        }
        if let Some(id) = product.type_id.filter(|id| !self.equipment_types.contains_key(id)) {
            return Err(StoreError::NotFound(format!("equipment type {id}")));
        }
        if let Some(id) = product.brand_id.filter(|id| !self.brands.contains_key(id)) {
            return Err(StoreError::NotFound(format!("brand {id}")));
        }
        Ok(())
    }

    /// Everything `commit_movement` checks before touching state.
    fn check_plan(&self, plan: &MovementPlan) -> Result<(), StoreError> {
        let entry = &plan.entry;
        self.require_product(entry.product_id)?;
        for unit in [entry.source_unit_id, entry.destination_unit_id].into_iter().flatten() {
            self.require_unit(unit)?;
        }

        if let Some(debit) = &plan.debit {
            let available = self
                .stocks
                .get(&(debit.product_id, debit.unit_id))
                .map(|s| s.quantity);
            match available {
                Some(q) if q >= debit.quantity => {}
                Some(q) => {
                    return Err(StoreError::Conflict(format!(
                        "insufficient stock: requested {}, available {q} at unit {}",
                        debit.quantity, debit.unit_id
                    )));
                }
                None => {
                    return Err(StoreError::Conflict(format!(
                        "insufficient stock: no balance at unit {}",
                        debit.unit_id
                    )));
                }
            }
        }

        if let Some(update) = &plan.item_update {
            let item = self
                .items
                .get(&update.item_id)
                .ok_or_else(|| StoreError::NotFound(format!("item {}", update.item_id)))?;
            if item.unit_id != update.expected_unit_id || item.status != ItemStatus::Available {
                return Err(StoreError::Conflict(format!(
                    "item {} changed since the movement was planned",
                    item.id
                )));
            }
            self.require_unit(update.unit_id)?;
        }

        if let Some(credit) = &plan.credit {
            let current = self
                .stocks
                .get(&(credit.product_id, credit.unit_id))
                .map_or(0, |s| s.quantity);
            if current.checked_add(credit.quantity).is_none() {
                return Err(StoreError::Conflict(format!(
                    "balance overflow: adding {} to {current} at unit {}",
                    credit.quantity, credit.unit_id
                )));
            }
        }

        if [plan.debit.as_ref().map(|d| d.quantity), plan.credit.as_ref().map(|c| c.quantity)]
            .into_iter()
            .flatten()
            .any(|q| q < 1)
        {
            return Err(StoreError::Conflict("balance changes must be positive".to_string()));
        }

        Ok(())
    }
}

/// In-memory balance store.
///
/// Intended for tests/dev. One write lock covers a whole commit, so a plan is
/// re-validated and applied without interleaving.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    state: RwLock<State>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    /// Overwrite a stored balance without a ledger entry, to reproduce drift.
    #[cfg(test)]
    pub(crate) fn force_stock_quantity(
        &self,
        product_id: ProductId,
        unit_id: UnitId,
        quantity: i64,
    ) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let min = state
            .products
            .get(&product_id)
            .map(|p| p.minimum_quantity)
            .unwrap_or(0);
        state
            .stocks
            .entry((product_id, unit_id))
            .or_insert_with(|| Stock::empty(product_id, unit_id, min))
            .quantity = quantity;
        Ok(())
    }
}

#[async_trait::async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        Ok(self.read()?.items.get(&id).cloned())
    }

    async fn get_unit(&self, id: UnitId) -> Result<Option<Unit>, StoreError> {
        Ok(self.read()?.units.get(&id).cloned())
    }

    async fn get_stock(&self, product_id: ProductId, unit_id: UnitId) -> Result<Option<Stock>, StoreError> {
        Ok(self.read()?.stocks.get(&(product_id, unit_id)).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.read()?.products.values().cloned().collect())
    }

    async fn list_units(&self) -> Result<Vec<Unit>, StoreError> {
        Ok(self.read()?.units.values().cloned().collect())
    }

    async fn list_stocks(&self) -> Result<Vec<Stock>, StoreError> {
        Ok(self.read()?.stocks.values().cloned().collect())
    }

    async fn list_stocks_for_product(&self, product_id: ProductId) -> Result<Vec<Stock>, StoreError> {
        Ok(self
            .read()?
            .stocks
            .values()
            .filter(|s| s.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn list_items_for_product(&self, product_id: ProductId) -> Result<Vec<Item>, StoreError> {
        Ok(self
            .read()?
            .items
            .values()
            .filter(|i| i.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn list_movements(
        &self,
        filter: &MovementFilter,
        pagination: Pagination,
    ) -> Result<MovementPage, StoreError> {
        let state = self.read()?;
        let mut matching: Vec<&Movement> = state.movements.iter().filter(|m| filter.matches(m)).collect();
        matching.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .cloned()
            .collect();

        Ok(MovementPage::new(page, total, pagination))
    }

    async fn movements_for_product(&self, product_id: ProductId) -> Result<Vec<Movement>, StoreError> {
        Ok(self
            .read()?
            .movements
            .iter()
            .filter(|m| m.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn taxonomy(&self) -> Result<Taxonomy, StoreError> {
        let state = self.read()?;
        Ok(Taxonomy {
            categories: state.categories.values().cloned().collect(),
            equipment_types: state.equipment_types.values().cloned().collect(),
            brands: state.brands.values().cloned().collect(),
            conditions: state.conditions.values().cloned().collect(),
        })
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Category, StoreError> {
        let mut state = self.write()?;
        if state.categories.values().any(|c| c.name == category.name) {
            return Err(StoreError::Conflict(format!("category '{}' already exists", category.name)));
        }

        let stored = Category {
            id: CategoryId::new(state.next_id()),
            name: category.name,
            description: category.description,
            active: true,
        };
        state.categories.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn insert_equipment_type(&self, kind: NewEquipmentType) -> Result<EquipmentType, StoreError> {
        let mut state = self.write()?;
        if !state.categories.contains_key(&kind.category_id) {
            return Err(StoreError::NotFound(format!("category {}", kind.category_id)));
        }
        if state.equipment_types.values().any(|t| t.name == kind.name) {
            return Err(StoreError::Conflict(format!("equipment type '{}' already exists", kind.name)));
        }

        let stored = EquipmentType {
            id: EquipmentTypeId::new(state.next_id()),
            name: kind.name,
            category_id: kind.category_id,
        };
        state.equipment_types.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn insert_brand(&self, brand: NewBrand) -> Result<Brand, StoreError> {
        let mut state = self.write()?;
        if state.brands.values().any(|b| b.name == brand.name) {
            return Err(StoreError::Conflict(format!("brand '{}' already exists", brand.name)));
        }

        let stored = Brand {
            id: BrandId::new(state.next_id()),
            name: brand.name,
        };
        state.brands.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn insert_condition(&self, condition: NewCondition) -> Result<Condition, StoreError> {
        let mut state = self.write()?;
        if state.conditions.values().any(|c| c.name == condition.name) {
            return Err(StoreError::Conflict(format!("condition '{}' already exists", condition.name)));
        }

        let stored = Condition {
            id: ConditionId::new(state.next_id()),
            name: condition.name,
        };
        state.conditions.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn insert_unit(&self, unit: NewUnit) -> Result<Unit, StoreError> {
        let mut state = self.write()?;
        if state.units.values().any(|u| u.name == unit.name) {
            return Err(StoreError::Conflict(format!("unit name '{}' already exists", unit.name)));
        }

        let stored = Unit {
            id: UnitId::new(state.next_id()),
            name: unit.name,
            manager: unit.manager,
        };
        state.units.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut state = self.write()?;
        state.require_classification(&product)?;

        let stored = Product {
            id: ProductId::new(state.next_id()),
            name: product.name,
            model: product.model,
            description: product.description,
            category_id: product.category_id,
            type_id: product.type_id,
            brand_id: product.brand_id,
            tracked_by_serial: product.tracked_by_serial,
            minimum_quantity: product.minimum_quantity,
            active: true,
        };
        state.products.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn insert_item(&self, item: NewItem) -> Result<Item, StoreError> {
        let mut state = self.write()?;
        state.require_product(item.product_id)?;
        state.require_unit(item.unit_id)?;
        if let Some(id) = item.acquisition.condition_id.filter(|id| !state.conditions.contains_key(id)) {
            return Err(StoreError::NotFound(format!("condition {id}")));
        }
        if state.items.values().any(|i| i.serial == item.serial) {
            return Err(StoreError::Conflict(format!("serial '{}' already registered", item.serial)));
        }

        let stored = Item {
            id: ItemId::new(state.next_id()),
            product_id: item.product_id,
            unit_id: item.unit_id,
            serial: item.serial,
            status: ItemStatus::Available,
            acquisition: item.acquisition,
            note: item.note,
        };
        state.items.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn commit_movement(&self, plan: &MovementPlan) -> Result<Movement, StoreError> {
        let mut state = self.write()?;
        // After check_plan the arithmetic below stays in range.
        state.check_plan(plan)?;

        if let Some(debit) = &plan.debit {
            if let Some(row) = state.stocks.get_mut(&(debit.product_id, debit.unit_id)) {
                row.quantity = row.quantity.saturating_sub(debit.quantity);
            }
        }

        if let Some(credit) = &plan.credit {
            let row = state
                .stocks
                .entry((credit.product_id, credit.unit_id))
                .or_insert_with(|| Stock::empty(credit.product_id, credit.unit_id, credit.minimum_quantity));
            row.quantity = row.quantity.saturating_add(credit.quantity);
        }

        if let Some(update) = &plan.item_update {
            if let Some(item) = state.items.get_mut(&update.item_id) {
                item.unit_id = update.unit_id;
                item.status = update.status;
            }
        }

        let id = MovementId::new(state.next_id());
        let movement = plan.entry.clone().into_movement(id);
        state.movements.push(movement.clone());
        Ok(movement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use patrimonio_core::UserId;
    use patrimonio_inventory::{MovementKind, NewMovement, StockCredit, StockDebit};

    async fn seeded() -> (InMemoryInventoryStore, Product, Unit, Unit) {
        let store = InMemoryInventoryStore::new();
        let a = store
            .insert_unit(NewUnit { name: "Almoxarifado".into(), manager: "Ana".into() })
            .await
            .unwrap();
        let b = store
            .insert_unit(NewUnit { name: "Escola".into(), manager: "Bia".into() })
            .await
            .unwrap();
        let product = store
            .insert_product(NewProduct {
                name: "Papel A4".into(),
                model: None,
                description: None,
                category_id: None,
                type_id: None,
                brand_id: None,
                tracked_by_serial: false,
                minimum_quantity: 2,
            })
            .await
            .unwrap();
        (store, product, a, b)
    }

    fn entry(product: &Product, kind: MovementKind, source: Option<UnitId>, dest: Option<UnitId>, q: i64) -> NewMovement {
        NewMovement {
            kind,
            product_id: product.id,
            item_id: None,
            source_unit_id: source,
            destination_unit_id: dest,
            quantity: q,
            user_id: UserId::new(1),
            occurred_at: Utc::now(),
            note: None,
        }
    }

    #[tokio::test]
    async fn credit_creates_row_with_product_minimum() {
        let (store, product, a, _) = seeded().await;
        let plan = MovementPlan {
            debit: None,
            credit: Some(StockCredit { product_id: product.id, unit_id: a.id, quantity: 5, minimum_quantity: 2 }),
            item_update: None,
            entry: entry(&product, MovementKind::Entrada, None, Some(a.id), 5),
        };
        store.commit_movement(&plan).await.unwrap();

        let stock = store.get_stock(product.id, a.id).await.unwrap().unwrap();
        assert_eq!(stock.quantity, 5);
        assert_eq!(stock.minimum_quantity, 2);
    }

    #[tokio::test]
    async fn stale_debit_is_rejected_without_side_effects() {
        let (store, product, a, b) = seeded().await;
        store.force_stock_quantity(product.id, a.id, 3).unwrap();

        let plan = MovementPlan {
            debit: Some(StockDebit { product_id: product.id, unit_id: a.id, quantity: 4 }),
            credit: Some(StockCredit { product_id: product.id, unit_id: b.id, quantity: 4, minimum_quantity: 2 }),
            item_update: None,
            entry: entry(&product, MovementKind::Transferencia, Some(a.id), Some(b.id), 4),
        };

        let err = store.commit_movement(&plan).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(msg) if msg.contains("insufficient stock")));
        assert_eq!(store.get_stock(product.id, a.id).await.unwrap().unwrap().quantity, 3);
        assert!(store.get_stock(product.id, b.id).await.unwrap().is_none());
        assert!(store.movements_for_product(product.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn overflowing_credit_is_rejected_and_lock_survives() {
        let (store, product, a, _) = seeded().await;
        store.force_stock_quantity(product.id, a.id, i64::MAX - 1).unwrap();

        let plan = MovementPlan {
            debit: None,
            credit: Some(StockCredit { product_id: product.id, unit_id: a.id, quantity: 2, minimum_quantity: 2 }),
            item_update: None,
            entry: entry(&product, MovementKind::Entrada, None, Some(a.id), 2),
        };
        let err = store.commit_movement(&plan).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(msg) if msg.contains("balance overflow")));

        assert_eq!(store.get_stock(product.id, a.id).await.unwrap().unwrap().quantity, i64::MAX - 1);
        assert!(store.movements_for_product(product.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_positive_balance_changes_are_rejected() {
        let (store, product, a, _) = seeded().await;
        let plan = MovementPlan {
            debit: None,
            credit: Some(StockCredit { product_id: product.id, unit_id: a.id, quantity: -5, minimum_quantity: 2 }),
            item_update: None,
            entry: entry(&product, MovementKind::Entrada, None, Some(a.id), -5),
        };
        assert!(matches!(store.commit_movement(&plan).await, Err(StoreError::Conflict(_))));
        assert!(store.get_stock(product.id, a.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_names_and_serials_conflict() {
        let (store, _, a, _) = seeded().await;
        let err = store
            .insert_unit(NewUnit { name: "Almoxarifado".into(), manager: "Outro".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let notebook = store
            .insert_product(NewProduct {
                name: "Notebook".into(),
                model: None,
                description: None,
                category_id: None,
                type_id: None,
                brand_id: None,
                tracked_by_serial: true,
                minimum_quantity: 0,
            })
            .await
            .unwrap();
        let new_item = NewItem { product_id: notebook.id, unit_id: a.id, serial: "PMX-1".into(), acquisition: Default::default(), note: None };
        let item = store.insert_item(new_item.clone()).await.unwrap();
        assert_eq!(item.status, ItemStatus::Available);
        assert!(matches!(store.insert_item(new_item).await, Err(StoreError::Conflict(_))));

        let orphan = NewItem { product_id: notebook.id, unit_id: UnitId::new(999), serial: "PMX-2".into(), acquisition: Default::default(), note: None };
        assert!(matches!(store.insert_item(orphan).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn classification_references_must_exist() {
        let (store, _, a, _) = seeded().await;
        let it = store
            .insert_category(NewCategory { name: "Informática".into(), description: None })
            .await
            .unwrap();
        let notebook = store
            .insert_equipment_type(NewEquipmentType { name: "Notebook".into(), category_id: it.id })
            .await
            .unwrap();
        let orphan_type = NewEquipmentType { name: "Tablet".into(), category_id: CategoryId::new(999) };
        assert!(matches!(store.insert_equipment_type(orphan_type).await, Err(StoreError::NotFound(_))));
        let dup = NewCategory { name: "Informática".into(), description: Some("outra".into()) };
        assert!(matches!(store.insert_category(dup).await, Err(StoreError::Conflict(_))));

        let classified = NewProduct {
            name: "Notebook 14".into(),
            category_id: Some(it.id),
            type_id: Some(notebook.id),
            tracked_by_serial: true,
            ..NewProduct::default()
        };
        let product = store.insert_product(classified.clone()).await.unwrap();
        assert_eq!(product.type_id, Some(notebook.id));

        let unknown_brand = NewProduct { brand_id: Some(BrandId::new(999)), ..classified };
        assert!(matches!(store.insert_product(unknown_brand).await, Err(StoreError::NotFound(_))));

        let bad_condition = NewItem {
            product_id: product.id,
            unit_id: a.id,
            serial: "NB-1".into(),
            acquisition: patrimonio_inventory::Acquisition {
                condition_id: Some(ConditionId::new(999)),
                ..Default::default()
            },
            note: None,
        };
        assert!(matches!(store.insert_item(bad_condition).await, Err(StoreError::NotFound(_))));

        let taxonomy = store.taxonomy().await.unwrap();
        assert_eq!(taxonomy.categories.len(), 1);
        assert_eq!(taxonomy.equipment_types.len(), 1);
        assert!(taxonomy.brands.is_empty());
    }

    #[tokio::test]
    async fn history_is_newest_first_and_paginated() {
        let (store, product, a, b) = seeded().await;
        for q in 1..=3 {
            let plan = MovementPlan {
                debit: None,
                credit: Some(StockCredit { product_id: product.id, unit_id: a.id, quantity: q, minimum_quantity: 2 }),
                item_update: None,
                entry: entry(&product, MovementKind::Entrada, None, Some(a.id), q),
            };
            store.commit_movement(&plan).await.unwrap();
        }

        let filter = MovementFilter { unit_id: Some(a.id), ..Default::default() };
        let page = store.list_movements(&filter, Pagination::new(Some(2), None)).await.unwrap();
        assert_eq!(page.total, 3);
        assert!(page.has_more);
        assert_eq!(page.movements[0].quantity, 3);

        let other = MovementFilter { unit_id: Some(b.id), ..Default::default() };
        assert_eq!(store.list_movements(&other, Pagination::default()).await.unwrap().total, 0);
    }
}
