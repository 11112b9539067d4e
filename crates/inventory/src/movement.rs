//! Stock ledger: how one movement request affects balances.
//!
//! Planning is pure. [`plan_movement`] looks at the current product, item and
//! source balance and either rejects the request or returns a [`MovementPlan`]
//! describing every mutation plus the ledger entry. The store applies a plan
//! atomically; nothing here performs IO.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use patrimonio_core::{DomainError, DomainResult, ItemId, MovementId, ProductId, UnitId, UserId};

use crate::catalog::{Item, ItemStatus, Product};

/// Kind of balance-affecting event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    /// Inbound receipt at the destination unit.
    Entrada,
    /// Outbound issue from the source unit.
    Saida,
    /// Unit-to-unit transfer.
    Transferencia,
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::Entrada => "ENTRADA",
            MovementKind::Saida => "SAIDA",
            MovementKind::Transferencia => "TRANSFERENCIA",
        }
    }

    /// Whether the movement takes quantity out of its source unit.
    pub fn debits_source(self) -> bool {
        matches!(self, MovementKind::Saida | MovementKind::Transferencia)
    }

    /// Whether the movement puts quantity into its destination unit.
    pub fn credits_destination(self) -> bool {
        matches!(self, MovementKind::Entrada | MovementKind::Transferencia)
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for MovementKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ENTRADA" => Ok(MovementKind::Entrada),
            "SAIDA" | "SAÍDA" => Ok(MovementKind::Saida),
            "TRANSFERENCIA" | "TRANSFERÊNCIA" => Ok(MovementKind::Transferencia),
            other => Err(DomainError::validation(format!(
                "movement type must be one of ENTRADA, SAIDA, TRANSFERENCIA (got '{other}')"
            ))),
        }
    }
}

/// Request to move stock, as supplied by the calling layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRequest {
    pub product_id: ProductId,
    pub kind: MovementKind,
    pub user_id: UserId,
    pub source_unit_id: Option<UnitId>,
    pub destination_unit_id: Option<UnitId>,
    /// Required iff the product is tracked by serial.
    pub item_id: Option<ItemId>,
    /// Ignored (forced to 1) for serialized products.
    pub quantity: i64,
    pub note: Option<String>,
}

/// Immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub kind: MovementKind,
    pub product_id: ProductId,
    pub item_id: Option<ItemId>,
    pub source_unit_id: Option<UnitId>,
    pub destination_unit_id: Option<UnitId>,
    pub quantity: i64,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
    pub note: Option<String>,
}

/// Ledger entry that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    pub kind: MovementKind,
    pub product_id: ProductId,
    pub item_id: Option<ItemId>,
    pub source_unit_id: Option<UnitId>,
    pub destination_unit_id: Option<UnitId>,
    pub quantity: i64,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
    pub note: Option<String>,
}

impl NewMovement {
    pub fn into_movement(self, id: MovementId) -> Movement {
        Movement {
            id,
            kind: self.kind,
            product_id: self.product_id,
            item_id: self.item_id,
            source_unit_id: self.source_unit_id,
            destination_unit_id: self.destination_unit_id,
            quantity: self.quantity,
            user_id: self.user_id,
            occurred_at: self.occurred_at,
            note: self.note,
        }
    }
}

/// Decrement of a bulk balance. Must fail at commit if the balance is short.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDebit {
    pub product_id: ProductId,
    pub unit_id: UnitId,
    pub quantity: i64,
}

/// Increment of a bulk balance, creating the row at zero if absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockCredit {
    pub product_id: ProductId,
    pub unit_id: UnitId,
    pub quantity: i64,
    /// Threshold for a row created by this credit.
    pub minimum_quantity: i64,
}

/// In-place change of a serialized item.
///
/// `expected_unit_id` is the location the plan was decided against; the store
/// rejects the update if the item moved in the meantime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUpdate {
    pub item_id: ItemId,
    pub expected_unit_id: UnitId,
    pub unit_id: UnitId,
    pub status: ItemStatus,
}

/// Every mutation one accepted movement causes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementPlan {
    pub debit: Option<StockDebit>,
    pub credit: Option<StockCredit>,
    pub item_update: Option<ItemUpdate>,
    pub entry: NewMovement,
}

/// Current state a movement is decided against.
#[derive(Debug, Clone, Copy)]
pub struct MovementContext<'a> {
    pub product: &'a Product,
    /// Item named by the request, if it exists.
    pub item: Option<&'a Item>,
    /// Balance of the product at the request's source unit; `None` when no row exists.
    pub source_balance: Option<i64>,
    /// Balance at the destination unit; `None` when no row exists yet.
    pub destination_balance: Option<i64>,
}

/// Validate a request against current state and decide its effects.
pub fn plan_movement(
    request: &MovementRequest,
    ctx: MovementContext<'_>,
    occurred_at: DateTime<Utc>,
) -> DomainResult<MovementPlan> {
    if request.product_id != ctx.product.id {
        return Err(DomainError::validation("request product does not match loaded product"));
    }

    if ctx.product.tracked_by_serial {
        plan_serialized(request, ctx, occurred_at)
    } else {
        plan_bulk(request, ctx, occurred_at)
    }
}

fn plan_serialized(
    request: &MovementRequest,
    ctx: MovementContext<'_>,
    occurred_at: DateTime<Utc>,
) -> DomainResult<MovementPlan> {
    let item_id = request
        .item_id
        .ok_or_else(|| DomainError::validation("item_id is required for serialized products"))?;

    let item = match ctx.item {
        Some(item) if item.id == item_id => item,
        _ => return Err(DomainError::not_found(format!("item {item_id}"))),
    };

    if item.product_id != ctx.product.id {
        return Err(DomainError::validation(format!(
            "item {} belongs to product {}, not {}",
            item.id, item.product_id, ctx.product.id
        )));
    }

    if item.is_retired() {
        return Err(DomainError::unsupported_transition(format!(
            "item {} is Baixado and cannot be moved; reactivation is not supported",
            item.id
        )));
    }

    if let Some(source) = request.source_unit_id {
        if source != item.unit_id {
            return Err(DomainError::conflict(format!(
                "item not at claimed source: item {} is at unit {}, not {}",
                item.id, item.unit_id, source
            )));
        }
    }

    let origin = item.unit_id;
    let (destination, item_update) = match request.kind {
        MovementKind::Transferencia => {
            let destination = request.destination_unit_id.ok_or_else(|| {
                DomainError::validation("destination unit is required for TRANSFERENCIA")
            })?;
            let update = ItemUpdate {
                item_id: item.id,
                expected_unit_id: origin,
                unit_id: destination,
                status: ItemStatus::Available,
            };
            (Some(destination), Some(update))
        }
        MovementKind::Saida => {
            let update = ItemUpdate {
                item_id: item.id,
                expected_unit_id: origin,
                unit_id: origin,
                status: ItemStatus::Baixado,
            };
            (request.destination_unit_id, Some(update))
        }
        MovementKind::Entrada => {
            if let Some(destination) = request.destination_unit_id {
                if destination != origin {
                    return Err(DomainError::validation(
                        "ENTRADA cannot relocate a serialized item; use TRANSFERENCIA",
                    ));
                }
            }
            (Some(origin), None)
        }
    };

    Ok(MovementPlan {
        debit: None,
        credit: None,
        item_update,
        entry: NewMovement {
            kind: request.kind,
            product_id: ctx.product.id,
            item_id: Some(item.id),
            source_unit_id: Some(origin),
            destination_unit_id: destination,
            quantity: 1,
            user_id: request.user_id,
            occurred_at,
            note: request.note.clone(),
        },
    })
}

fn plan_bulk(
    request: &MovementRequest,
    ctx: MovementContext<'_>,
    occurred_at: DateTime<Utc>,
) -> DomainResult<MovementPlan> {
    if request.item_id.is_some() {
        return Err(DomainError::validation(format!(
            "item_id applies only to serialized products; product {} is tracked in bulk",
            ctx.product.id
        )));
    }
    if request.quantity < 1 {
        return Err(DomainError::validation("quantity must be at least 1"));
    }

    let kind = request.kind;
    let source = match (kind.debits_source(), request.source_unit_id) {
        (true, None) => {
            return Err(DomainError::validation(format!("source unit is required for {kind}")));
        }
        (_, source) => source,
    };
    let destination = match (kind.credits_destination(), request.destination_unit_id) {
        (true, None) => {
            return Err(DomainError::validation(format!(
                "destination unit is required for {kind}"
            )));
        }
        (_, destination) => destination,
    };

    let debit = match source.filter(|_| kind.debits_source()) {
        Some(unit_id) => {
            match ctx.source_balance {
                None => {
                    return Err(DomainError::conflict(format!(
                        "insufficient stock: product {} has no balance at unit {unit_id}",
                        ctx.product.id
                    )));
                }
                Some(available) if available < request.quantity => {
                    return Err(DomainError::conflict(format!(
                        "insufficient stock: requested {}, available {available} at unit {unit_id}",
                        request.quantity
                    )));
                }
                Some(_) => {}
            }
            Some(StockDebit {
                product_id: ctx.product.id,
                unit_id,
                quantity: request.quantity,
            })
        }
        None => None,
    };

    let credit = match destination.filter(|_| kind.credits_destination()) {
        Some(unit_id) => {
            let current = ctx.destination_balance.unwrap_or(0);
            if current.checked_add(request.quantity).is_none() {
                return Err(DomainError::conflict(format!(
                    "balance overflow: adding {} to {current} at unit {unit_id} exceeds the representable range",
                    request.quantity
                )));
            }
            Some(StockCredit {
                product_id: ctx.product.id,
                unit_id,
                quantity: request.quantity,
                minimum_quantity: ctx.product.minimum_quantity,
            })
        }
        None => None,
    };

    Ok(MovementPlan {
        debit,
        credit,
        item_update: None,
        entry: NewMovement {
            kind,
            product_id: ctx.product.id,
            item_id: None,
            source_unit_id: source,
            destination_unit_id: destination,
            quantity: request.quantity,
            user_id: request.user_id,
            occurred_at,
            note: request.note.clone(),
        },
    })
}
