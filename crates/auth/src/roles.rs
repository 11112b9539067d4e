use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Capability;

/// Access profile assigned to a user.
///
/// Wire names match the profile keys stored on user records.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Master,
    AdminMunicipal,
    GestorEstoque,
    GestorProtocolo,
    GestorGeral,
    Operador,
}

const FULL_STOCK: &[Capability] = &[
    Capability::ViewStock,
    Capability::MoveStock,
    Capability::ManageCatalog,
    Capability::GenerateStockReport,
];

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Master,
        Role::AdminMunicipal,
        Role::GestorEstoque,
        Role::GestorProtocolo,
        Role::GestorGeral,
        Role::Operador,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Master => "master",
            Role::AdminMunicipal => "admin_municipal",
            Role::GestorEstoque => "gestor_estoque",
            Role::GestorProtocolo => "gestor_protocolo",
            Role::GestorGeral => "gestor_geral",
            Role::Operador => "operador",
        }
    }

    /// Stock capabilities granted by this role.
    ///
    /// `GestorProtocolo` only works with document routing and holds none.
    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            Role::Master | Role::AdminMunicipal | Role::GestorEstoque | Role::GestorGeral => {
                FULL_STOCK
            }
            Role::GestorProtocolo => &[],
            Role::Operador => &[Capability::ViewStock],
        }
    }

    pub fn grants(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a role name does not match any known profile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}
