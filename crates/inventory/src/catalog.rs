use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use patrimonio_core::{
    BrandId, CategoryId, ConditionId, DomainError, DomainResult, EquipmentTypeId, ItemId, ProductId, UnitId,
};

/// Organizational unit holding physical custody of stock and items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub manager: String,
}

/// Catalog entry.
///
/// `tracked_by_serial` decides how instances are counted: individually as
/// [`Item`]s, or in aggregate as a [`Stock`] quantity per unit. The
/// organizational scope of a product is wherever its stock rows and items
/// sit; the product itself only carries its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub model: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub type_id: Option<EquipmentTypeId>,
    pub brand_id: Option<BrandId>,
    pub tracked_by_serial: bool,
    /// Threshold copied onto stock rows created for this product.
    pub minimum_quantity: i64,
    pub active: bool,
}

/// Lifecycle status of a serialized item.
///
/// `Available -> Baixado` is one-way: nothing returns a retired item to circulation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemStatus {
    #[serde(rename = "Disponível")]
    Available,
    #[serde(rename = "Baixado")]
    Baixado,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Available => "Disponível",
            ItemStatus::Baixado => "Baixado",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "Disponível" => Ok(ItemStatus::Available),
            "Baixado" => Ok(ItemStatus::Baixado),
            other => Err(DomainError::validation(format!("unknown item status '{other}'"))),
        }
    }
}

impl core::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One physical serialized unit of a product (asset tag / serial number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub product_id: ProductId,
    pub unit_id: UnitId,
    pub serial: String,
    pub status: ItemStatus,
    #[serde(flatten)]
    pub acquisition: Acquisition,
    pub note: Option<String>,
}

/// Procurement record and physical condition of a serialized item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acquisition {
    pub condition_id: Option<ConditionId>,
    pub acquired_on: Option<NaiveDate>,
    /// Price in smallest currency unit (centavos).
    pub acquisition_value_cents: Option<i64>,
    pub warranty_until: Option<NaiveDate>,
}

impl Acquisition {
    pub fn validate(&self) -> DomainResult<()> {
        if self.acquisition_value_cents.is_some_and(|v| v < 0) {
            return Err(DomainError::validation("acquisition value cannot be negative"));
        }
        if let (Some(acquired), Some(warranty)) = (self.acquired_on, self.warranty_until) {
            if warranty < acquired {
                return Err(DomainError::validation(format!(
                    "warranty ends {warranty}, before the acquisition date {acquired}"
                )));
            }
        }
        Ok(())
    }
}

impl Item {
    pub fn is_retired(&self) -> bool {
        self.status == ItemStatus::Baixado
    }
}

/// Aggregate balance of a bulk product at one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub product_id: ProductId,
    pub unit_id: UnitId,
    pub quantity: i64,
    pub minimum_quantity: i64,
    pub location: Option<String>,
}

impl Stock {
    /// Fresh zero balance, as created on the first credit to a (product, unit) pair.
    pub fn empty(product_id: ProductId, unit_id: UnitId, minimum_quantity: i64) -> Self {
        Self {
            product_id,
            unit_id,
            quantity: 0,
            minimum_quantity,
            location: None,
        }
    }

    pub fn is_below_minimum(&self) -> bool {
        self.quantity < self.minimum_quantity
    }
}

/// Stock rows whose quantity on hand is below their minimum threshold.
pub fn low_stock(stocks: &[Stock]) -> Vec<Stock> {
    stocks.iter().filter(|s| s.is_below_minimum()).cloned().collect()
}

/// Registration request: unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUnit {
    pub name: String,
    pub manager: String,
}

impl NewUnit {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("unit name cannot be empty"));
        }
        if self.manager.trim().is_empty() {
            return Err(DomainError::validation("unit manager cannot be empty"));
        }
        Ok(())
    }
}

/// Registration request: product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub model: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub type_id: Option<EquipmentTypeId>,
    pub brand_id: Option<BrandId>,
    pub tracked_by_serial: bool,
    pub minimum_quantity: i64,
}

impl NewProduct {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if self.minimum_quantity < 0 {
            return Err(DomainError::validation("minimum quantity cannot be negative"));
        }
        Ok(())
    }
}

/// Registration request: serialized item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub product_id: ProductId,
    pub unit_id: UnitId,
    pub serial: String,
    #[serde(flatten)]
    pub acquisition: Acquisition,
    pub note: Option<String>,
}

impl NewItem {
    /// Items only exist for serialized products and always need a tag.
    pub fn validate(&self, product: &Product) -> DomainResult<()> {
        if product.id != self.product_id {
            return Err(DomainError::validation("item product does not match"));
        }
        if !product.tracked_by_serial {
            return Err(DomainError::validation(format!(
                "product {} is not tracked by serial; register stock through movements",
                product.id
            )));
        }
        if self.serial.trim().is_empty() {
            return Err(DomainError::validation("serial cannot be empty"));
        }
        self.acquisition.validate()
    }
}
