//! Reference tables that classify products and items.
//!
//! A product may name a category, an equipment type and a brand; an item may
//! name its physical condition. All references are optional at registration,
//! but when present they must point at existing entries.

use serde::{Deserialize, Serialize};

use patrimonio_core::{BrandId, CategoryId, ConditionId, DomainError, DomainResult, EquipmentTypeId};

use crate::catalog::{NewItem, NewProduct};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    /// Inactive categories stay readable but accept no new products.
    pub active: bool,
}

/// Kind of equipment, always filed under one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentType {
    pub id: EquipmentTypeId,
    pub name: String,
    pub category_id: CategoryId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
}

/// Physical condition label of a serialized item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub id: ConditionId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEquipmentType {
    pub name: String,
    pub category_id: CategoryId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBrand {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCondition {
    pub name: String,
}

fn require_name(kind: &str, name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation(format!("{kind} name cannot be empty")));
    }
    Ok(())
}

impl NewCategory {
    pub fn validate(&self) -> DomainResult<()> {
        require_name("category", &self.name)
    }
}

impl NewEquipmentType {
    pub fn validate(&self) -> DomainResult<()> {
        require_name("equipment type", &self.name)
    }
}

impl NewBrand {
    pub fn validate(&self) -> DomainResult<()> {
        require_name("brand", &self.name)
    }
}

impl NewCondition {
    pub fn validate(&self) -> DomainResult<()> {
        require_name("condition", &self.name)
    }
}

/// Snapshot of every reference table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub categories: Vec<Category>,
    pub equipment_types: Vec<EquipmentType>,
    pub brands: Vec<Brand>,
    pub conditions: Vec<Condition>,
}

impl Taxonomy {
    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn equipment_type(&self, id: EquipmentTypeId) -> Option<&EquipmentType> {
        self.equipment_types.iter().find(|t| t.id == id)
    }

    pub fn brand(&self, id: BrandId) -> Option<&Brand> {
        self.brands.iter().find(|b| b.id == id)
    }

    pub fn condition(&self, id: ConditionId) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.id == id)
    }

    /// Check a product's classification.
    ///
    /// Missing references are `NotFound`. An inactive category, or a type
    /// filed under a different category than the product names, is a
    /// `Validation` error.
    pub fn check_product(&self, product: &NewProduct) -> DomainResult<()> {
        if let Some(id) = product.category_id {
            let category = self
                .category(id)
                .ok_or_else(|| DomainError::not_found(format!("category {id}")))?;
            if !category.active {
                return Err(DomainError::validation(format!(
                    "category '{}' is inactive",
                    category.name
                )));
            }
        }

        if let Some(id) = product.type_id {
            let kind = self
                .equipment_type(id)
                .ok_or_else(|| DomainError::not_found(format!("equipment type {id}")))?;
            if let Some(category_id) = product.category_id {
                if kind.category_id != category_id {
                    return Err(DomainError::validation(format!(
                        "equipment type '{}' belongs to category {}, not {category_id}",
                        kind.name, kind.category_id
                    )));
                }
            }
        }

        if let Some(id) = product.brand_id {
            self.brand(id)
                .ok_or_else(|| DomainError::not_found(format!("brand {id}")))?;
        }

        Ok(())
    }

    pub fn check_item(&self, item: &NewItem) -> DomainResult<()> {
        if let Some(id) = item.acquisition.condition_id {
            self.condition(id)
                .ok_or_else(|| DomainError::not_found(format!("condition {id}")))?;
        }
        Ok(())
    }
}
