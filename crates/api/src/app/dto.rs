use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use patrimonio_auth::{AuthorizationExplanation, Capability, explain_authorization};
use patrimonio_core::{BrandId, CategoryId, ConditionId, EquipmentTypeId, ItemId, ProductId, UnitId, UserId};
use patrimonio_infra::{MovementFilter, Pagination};
use patrimonio_inventory::{
    Acquisition, MovementKind, MovementRequest, NewBrand, NewCategory, NewCondition, NewEquipmentType,
    NewItem, NewProduct, NewUnit,
};

use crate::app::errors;
use crate::context::PrincipalContext;

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /movements`. Accepts the field names used by the municipal
/// front-end (`tipo`, `unit_origem_id`, ...) as aliases.
#[derive(Debug, Deserialize)]
pub struct CreateMovementRequest {
    pub product_id: ProductId,
    #[serde(alias = "tipo")]
    pub kind: String,
    #[serde(default, alias = "unit_origem_id")]
    pub source_unit_id: Option<UnitId>,
    #[serde(default, alias = "unit_destino_id")]
    pub destination_unit_id: Option<UnitId>,
    #[serde(default)]
    pub item_id: Option<ItemId>,
    #[serde(default = "default_quantity", alias = "quantidade")]
    pub quantity: i64,
    #[serde(default, alias = "observacao")]
    pub note: Option<String>,
}

fn default_quantity() -> i64 {
    1
}

impl CreateMovementRequest {
    /// The acting user always comes from the session, never from the body.
    pub fn into_request(self, user_id: UserId) -> Result<MovementRequest, axum::response::Response> {
        let kind: MovementKind = self.kind.parse().map_err(|e: patrimonio_core::DomainError| {
            errors::json_error(axum::http::StatusCode::BAD_REQUEST, "validation_error", e.to_string())
        })?;

        Ok(MovementRequest {
            product_id: self.product_id,
            kind,
            user_id,
            source_unit_id: self.source_unit_id,
            destination_unit_id: self.destination_unit_id,
            item_id: self.item_id,
            quantity: self.quantity,
            note: self.note,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUnitRequest {
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(alias = "responsavel")]
    pub manager: String,
}

impl From<CreateUnitRequest> for NewUnit {
    fn from(body: CreateUnitRequest) -> Self {
        NewUnit {
            name: body.name,
            manager: body.manager,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(default, alias = "modelo")]
    pub model: Option<String>,
    #[serde(default, alias = "descricao")]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub type_id: Option<EquipmentTypeId>,
    #[serde(default)]
    pub brand_id: Option<BrandId>,
    #[serde(default, alias = "controle_por_serial")]
    pub tracked_by_serial: bool,
    #[serde(default, alias = "estoque_minimo")]
    pub minimum_quantity: i64,
}

impl From<CreateProductRequest> for NewProduct {
    fn from(body: CreateProductRequest) -> Self {
        NewProduct {
            name: body.name,
            model: body.model,
            description: body.description,
            category_id: body.category_id,
            type_id: body.type_id,
            brand_id: body.brand_id,
            tracked_by_serial: body.tracked_by_serial,
            minimum_quantity: body.minimum_quantity,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub product_id: ProductId,
    pub unit_id: UnitId,
    #[serde(alias = "tombo")]
    pub serial: String,
    #[serde(default, alias = "estado_id")]
    pub condition_id: Option<ConditionId>,
    #[serde(default, alias = "data_aquisicao")]
    pub acquired_on: Option<NaiveDate>,
    #[serde(default)]
    pub acquisition_value_cents: Option<i64>,
    #[serde(default, alias = "garantia_ate")]
    pub warranty_until: Option<NaiveDate>,
    #[serde(default, alias = "observacao")]
    pub note: Option<String>,
}

impl From<CreateItemRequest> for NewItem {
    fn from(body: CreateItemRequest) -> Self {
        NewItem {
            product_id: body.product_id,
            unit_id: body.unit_id,
            serial: body.serial,
            acquisition: Acquisition {
                condition_id: body.condition_id,
                acquired_on: body.acquired_on,
                acquisition_value_cents: body.acquisition_value_cents,
                warranty_until: body.warranty_until,
            },
            note: body.note,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(default, alias = "descricao")]
    pub description: Option<String>,
}

impl From<CreateCategoryRequest> for NewCategory {
    fn from(body: CreateCategoryRequest) -> Self {
        NewCategory {
            name: body.name,
            description: body.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateEquipmentTypeRequest {
    #[serde(alias = "nome")]
    pub name: String,
    pub category_id: CategoryId,
}

impl From<CreateEquipmentTypeRequest> for NewEquipmentType {
    fn from(body: CreateEquipmentTypeRequest) -> Self {
        NewEquipmentType {
            name: body.name,
            category_id: body.category_id,
        }
    }
}

/// Body shared by brands and item conditions.
#[derive(Debug, Deserialize)]
pub struct CreateNamedRequest {
    #[serde(alias = "nome")]
    pub name: String,
}

impl From<CreateNamedRequest> for NewBrand {
    fn from(body: CreateNamedRequest) -> Self {
        NewBrand { name: body.name }
    }
}

impl From<CreateNamedRequest> for NewCondition {
    fn from(body: CreateNamedRequest) -> Self {
        NewCondition { name: body.name }
    }
}

/// Query string of `GET /movements`.
#[derive(Debug, Default, Deserialize)]
pub struct MovementHistoryQuery {
    pub product_id: Option<ProductId>,
    pub item_id: Option<ItemId>,
    pub unit_id: Option<UnitId>,
    pub kind: Option<String>,
    pub occurred_after: Option<DateTime<Utc>>,
    pub occurred_before: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl MovementHistoryQuery {
    pub fn into_filter(self) -> Result<(MovementFilter, Pagination), axum::response::Response> {
        let kind = match self.kind.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<MovementKind>().map_err(|e| {
                errors::json_error(axum::http::StatusCode::BAD_REQUEST, "validation_error", e.to_string())
            })?),
        };

        let filter = MovementFilter {
            product_id: self.product_id,
            item_id: self.item_id,
            unit_id: self.unit_id,
            kind,
            occurred_after: self.occurred_after,
            occurred_before: self.occurred_before,
        };
        Ok((filter, Pagination::new(self.limit, self.offset)))
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub user_id: UserId,
    pub role: patrimonio_auth::Role,
    pub capabilities: Vec<AuthorizationExplanation>,
}

impl WhoAmIResponse {
    pub fn for_principal(principal: &PrincipalContext) -> Self {
        Self {
            user_id: principal.user_id(),
            role: principal.role(),
            capabilities: Capability::ALL
                .iter()
                .map(|c| explain_authorization(principal.principal(), *c))
                .collect(),
        }
    }
}
