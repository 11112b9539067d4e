//! Reconciliation of stored balances against the movement ledger.
//!
//! Everything here is read-only: divergence is reported, never corrected.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use patrimonio_core::{ProductId, UnitId};

use crate::catalog::{Item, Product, Stock};
use crate::movement::{Movement, MovementKind};

/// Unit display names available to the report. Units missing from the map
/// are reported without a name.
pub type UnitNames = HashMap<UnitId, String>;

/// How a product's balances are tracked.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingKind {
    Serialized,
    Bulk,
}

/// Reconciliation of one product at one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitReconciliation {
    pub unit_id: UnitId,
    pub unit_name: Option<String>,
    /// Balance derived independently of the stored value.
    pub computed: i64,
    /// Persisted balance; `None` when no stock row exists (always `None` for serialized products).
    pub stored: Option<i64>,
    /// `computed - stored`; `None` for serialized products.
    pub divergence: Option<i64>,
}

/// Reconciliation report for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAudit {
    pub product_id: ProductId,
    pub product_name: String,
    pub kind: TrackingKind,
    pub units: Vec<UnitReconciliation>,
}

impl ProductAudit {
    pub fn has_divergence(&self) -> bool {
        self.units
            .iter()
            .any(|u| u.divergence.is_some_and(|d| d != 0))
    }
}

/// Replay the ledger of one product into per-unit balances.
///
/// ENTRADA and TRANSFERENCIA add to their destination; SAIDA and
/// TRANSFERENCIA subtract from their origin. Sums saturate at the `i64`
/// bounds so a corrupt ledger still yields a report instead of a panic.
pub fn ledger_balances(product_id: ProductId, movements: &[Movement]) -> BTreeMap<UnitId, i64> {
    let mut balances: BTreeMap<UnitId, i64> = BTreeMap::new();

    for m in movements.iter().filter(|m| m.product_id == product_id) {
        if m.kind.credits_destination() {
            if let Some(unit) = m.destination_unit_id {
                let balance = balances.entry(unit).or_insert(0);
                *balance = balance.saturating_add(m.quantity);
            }
        }
        if m.kind.debits_source() {
            if let Some(unit) = m.source_unit_id {
                let balance = balances.entry(unit).or_insert(0);
                *balance = balance.saturating_sub(m.quantity);
            }
        }
    }

    balances
}

/// Compare a bulk product's stock rows with its ledger replay.
///
/// Every stock row is reported. Units that only appear in the ledger are
/// reported too, with `stored: None` and the divergence taken against zero.
pub fn reconcile_bulk(
    product: &Product,
    stocks: &[Stock],
    movements: &[Movement],
    unit_names: &UnitNames,
) -> ProductAudit {
    let mut computed = ledger_balances(product.id, movements);
    let mut units = Vec::new();

    let mut rows: Vec<&Stock> = stocks.iter().filter(|s| s.product_id == product.id).collect();
    rows.sort_by_key(|s| s.unit_id);

    for stock in rows {
        let value = computed.remove(&stock.unit_id).unwrap_or(0);
        units.push(UnitReconciliation {
            unit_id: stock.unit_id,
            unit_name: unit_names.get(&stock.unit_id).cloned(),
            computed: value,
            stored: Some(stock.quantity),
            divergence: Some(value.saturating_sub(stock.quantity)),
        });
    }

    for (unit_id, value) in computed {
        units.push(UnitReconciliation {
            unit_id,
            unit_name: unit_names.get(&unit_id).cloned(),
            computed: value,
            stored: None,
            divergence: Some(value),
        });
    }
    units.sort_by_key(|u| u.unit_id);

    ProductAudit {
        product_id: product.id,
        product_name: product.name.clone(),
        kind: TrackingKind::Bulk,
        units,
    }
}

/// Count a serialized product's items in circulation per unit.
///
/// Item location is mutated in place, so this is a snapshot rather than a
/// ledger replay. Retired (`Baixado`) items are excluded.
pub fn reconcile_serialized(product: &Product, items: &[Item], unit_names: &UnitNames) -> ProductAudit {
    let mut counts: BTreeMap<UnitId, i64> = BTreeMap::new();
    for item in items
        .iter()
        .filter(|i| i.product_id == product.id && !i.is_retired())
    {
        *counts.entry(item.unit_id).or_insert(0) += 1;
    }

    let units = counts
        .into_iter()
        .map(|(unit_id, count)| UnitReconciliation {
            unit_id,
            unit_name: unit_names.get(&unit_id).cloned(),
            computed: count,
            stored: None,
            divergence: None,
        })
        .collect();

    ProductAudit {
        product_id: product.id,
        product_name: product.name.clone(),
        kind: TrackingKind::Serialized,
        units,
    }
}

/// Reconcile one product according to how it is tracked.
pub fn reconcile_product(
    product: &Product,
    stocks: &[Stock],
    items: &[Item],
    movements: &[Movement],
    unit_names: &UnitNames,
) -> ProductAudit {
    if product.tracked_by_serial {
        reconcile_serialized(product, items, unit_names)
    } else {
        reconcile_bulk(product, stocks, movements, unit_names)
    }
}
