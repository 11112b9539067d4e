//! Movement history queries.
//!
//! Ledger reads for inspection are filtered and paginated by default.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use patrimonio_core::{ItemId, ProductId, UnitId};
use patrimonio_inventory::{Movement, MovementKind};

/// Pagination parameters for ledger queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of movements to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 1000;

    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Filter criteria for ledger queries. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<ProductId>,
    pub item_id: Option<ItemId>,
    /// Matches movements with this unit on either side.
    pub unit_id: Option<UnitId>,
    pub kind: Option<MovementKind>,
    pub occurred_after: Option<DateTime<Utc>>,
    pub occurred_before: Option<DateTime<Utc>>,
}

impl MovementFilter {
    pub fn matches(&self, m: &Movement) -> bool {
        self.product_id.is_none_or(|p| m.product_id == p)
            && self.item_id.is_none_or(|i| m.item_id == Some(i))
            && self.unit_id.is_none_or(|u| {
                m.source_unit_id == Some(u) || m.destination_unit_id == Some(u)
            })
            && self.kind.is_none_or(|k| m.kind == k)
            && self.occurred_after.is_none_or(|t| m.occurred_at >= t)
            && self.occurred_before.is_none_or(|t| m.occurred_at < t)
    }
}

/// One page of ledger entries, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementPage {
    pub movements: Vec<Movement>,
    /// Total number of movements matching the filter (across all pages).
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

impl MovementPage {
    pub(crate) fn new(movements: Vec<Movement>, total: u64, pagination: Pagination) -> Self {
        let has_more = u64::from(pagination.offset) + (movements.len() as u64) < total;
        Self {
            movements,
            total,
            pagination,
            has_more,
        }
    }
}
