//! Catalog registration and stock views.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use patrimonio_core::{DomainError, ProductId, UnitId};
use patrimonio_inventory::{
    Brand, Category, Condition, EquipmentType, Item, NewBrand, NewCategory, NewCondition, NewEquipmentType,
    NewItem, NewProduct, NewUnit, Product, Stock, Taxonomy, Unit, UnitNames, low_stock,
};

use crate::error::ServiceError;
use crate::store::{InventoryStore, MovementFilter, MovementPage, Pagination};

/// Balance of one product at one unit, with the unit's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockView {
    pub product_id: ProductId,
    pub unit_id: UnitId,
    pub unit_name: Option<String>,
    pub quantity: i64,
    pub minimum_quantity: i64,
    pub location: Option<String>,
    pub below_minimum: bool,
}

impl StockView {
    fn from_stock(stock: Stock, names: &UnitNames) -> Self {
        Self {
            below_minimum: stock.is_below_minimum(),
            unit_name: names.get(&stock.unit_id).cloned(),
            product_id: stock.product_id,
            unit_id: stock.unit_id,
            quantity: stock.quantity,
            minimum_quantity: stock.minimum_quantity,
            location: stock.location,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogService<S> {
    store: S,
}

impl<S> CatalogService<S>
where
    S: InventoryStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip(self, unit), fields(name = %unit.name), err)]
    pub async fn register_unit(&self, unit: NewUnit) -> Result<Unit, ServiceError> {
        unit.validate()?;
        let unit = self.store.insert_unit(unit).await?;
        info!(unit_id = %unit.id, "unit registered");
        Ok(unit)
    }

    #[instrument(skip(self, category), fields(name = %category.name), err)]
    pub async fn register_category(&self, category: NewCategory) -> Result<Category, ServiceError> {
        category.validate()?;
        let category = self.store.insert_category(category).await?;
        info!(category_id = %category.id, "category registered");
        Ok(category)
    }

    #[instrument(skip(self, kind), fields(name = %kind.name, category_id = %kind.category_id), err)]
    pub async fn register_equipment_type(&self, kind: NewEquipmentType) -> Result<EquipmentType, ServiceError> {
        kind.validate()?;
        let kind = self.store.insert_equipment_type(kind).await?;
        info!(type_id = %kind.id, "equipment type registered");
        Ok(kind)
    }

    #[instrument(skip(self, brand), fields(name = %brand.name), err)]
    pub async fn register_brand(&self, brand: NewBrand) -> Result<Brand, ServiceError> {
        brand.validate()?;
        let brand = self.store.insert_brand(brand).await?;
        info!(brand_id = %brand.id, "brand registered");
        Ok(brand)
    }

    #[instrument(skip(self, condition), fields(name = %condition.name), err)]
    pub async fn register_condition(&self, condition: NewCondition) -> Result<Condition, ServiceError> {
        condition.validate()?;
        let condition = self.store.insert_condition(condition).await?;
        info!(condition_id = %condition.id, "item condition registered");
        Ok(condition)
    }

    pub async fn taxonomy(&self) -> Result<Taxonomy, ServiceError> {
        Ok(self.store.taxonomy().await?)
    }

    #[instrument(skip(self, product), fields(name = %product.name), err)]
    pub async fn register_product(&self, product: NewProduct) -> Result<Product, ServiceError> {
        product.validate()?;
        if product.category_id.is_some() || product.type_id.is_some() || product.brand_id.is_some() {
            self.store.taxonomy().await?.check_product(&product)?;
        }
        let product = self.store.insert_product(product).await?;
        info!(product_id = %product.id, tracked_by_serial = product.tracked_by_serial, "product registered");
        Ok(product)
    }

    /// Register a serialized item at its initial unit. Registration is not a
    /// movement and leaves the ledger untouched.
    #[instrument(skip(self, item), fields(product_id = %item.product_id, unit_id = %item.unit_id), err)]
    pub async fn register_item(&self, item: NewItem) -> Result<Item, ServiceError> {
        let product = self
            .store
            .get_product(item.product_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("product {}", item.product_id)))?;
        item.validate(&product)?;
        if self.store.get_unit(item.unit_id).await?.is_none() {
            return Err(DomainError::not_found(format!("unit {}", item.unit_id)).into());
        }
        if item.acquisition.condition_id.is_some() {
            self.store.taxonomy().await?.check_item(&item)?;
        }

        let item = self.store.insert_item(item).await?;
        info!(item_id = %item.id, "item registered");
        Ok(item)
    }

    pub async fn get_product(&self, product_id: ProductId) -> Result<Product, ServiceError> {
        self.store
            .get_product(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("product {product_id}")).into())
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, ServiceError> {
        Ok(self.store.list_products().await?)
    }

    pub async fn list_units(&self) -> Result<Vec<Unit>, ServiceError> {
        Ok(self.store.list_units().await?)
    }

    pub async fn list_items(&self, product_id: ProductId) -> Result<Vec<Item>, ServiceError> {
        self.get_product(product_id).await?;
        Ok(self.store.list_items_for_product(product_id).await?)
    }

    /// Per-unit balances of one product.
    pub async fn stock_by_product(&self, product_id: ProductId) -> Result<Vec<StockView>, ServiceError> {
        self.get_product(product_id).await?;
        let names = self.unit_names().await?;
        Ok(self
            .store
            .list_stocks_for_product(product_id)
            .await?
            .into_iter()
            .map(|s| StockView::from_stock(s, &names))
            .collect())
    }

    /// Every balance below its minimum threshold.
    pub async fn low_stock(&self) -> Result<Vec<StockView>, ServiceError> {
        let names = self.unit_names().await?;
        let stocks = self.store.list_stocks().await?;
        Ok(low_stock(&stocks)
            .into_iter()
            .map(|s| StockView::from_stock(s, &names))
            .collect())
    }

    pub async fn movement_history(
        &self,
        filter: &MovementFilter,
        pagination: Pagination,
    ) -> Result<MovementPage, ServiceError> {
        Ok(self.store.list_movements(filter, pagination).await?)
    }

    async fn unit_names(&self) -> Result<UnitNames, ServiceError> {
        Ok(self
            .store
            .list_units()
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect())
    }
}
