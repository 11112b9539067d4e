use serde::{Deserialize, Serialize};

/// Capability required by a stock operation.
///
/// Capabilities are a closed set: every route declares the one it needs and
/// roles grant them statically (see [`crate::Role::capabilities`]).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Read balances, items, movement history and low-stock views.
    ViewStock,
    /// Submit ENTRADA / SAIDA / TRANSFERENCIA movements.
    MoveStock,
    /// Register units, products and serialized items.
    ManageCatalog,
    /// Run reconciliation reports.
    GenerateStockReport,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::ViewStock,
        Capability::MoveStock,
        Capability::ManageCatalog,
        Capability::GenerateStockReport,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::ViewStock => "view_stock",
            Capability::MoveStock => "move_stock",
            Capability::ManageCatalog => "manage_catalog",
            Capability::GenerateStockReport => "generate_stock_report",
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
