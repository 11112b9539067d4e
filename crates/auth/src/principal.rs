use serde::{Deserialize, Serialize};

use patrimonio_core::UserId;

use crate::Role;

/// A fully resolved principal for authorization decisions.
///
/// Construction is decoupled from transport: the API derives it from a
/// resolved session and checks capabilities before calling into the domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }
}
