use serde::Serialize;
use thiserror::Error;

use crate::{Capability, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{role}' lacks capability '{capability}'")]
    Forbidden { role: String, capability: Capability },
}

/// Authorize a principal for one capability.
///
/// - No IO
/// - No panics
/// - Pure policy check against the role's static grant set
pub fn authorize(principal: &Principal, required: Capability) -> Result<(), AuthzError> {
    if principal.role.grants(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            role: principal.role.to_string(),
            capability: required,
        })
    }
}

/// Explanation of an authorization decision, returned by `whoami`-style
/// endpoints so operators can see what a session is allowed to do.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub required: Capability,
    pub granted: bool,
    pub reason: String,
}

pub fn explain_authorization(principal: &Principal, required: Capability) -> AuthorizationExplanation {
    let granted = principal.role.grants(required);
    let reason = if granted {
        format!("role '{}' grants '{}'", principal.role, required)
    } else {
        let granting: Vec<&str> = crate::Role::ALL
            .into_iter()
            .filter(|r| r.grants(required))
            .map(|r| r.as_str())
            .collect();
        format!(
            "role '{}' lacks '{}'; granted by: {}",
            principal.role,
            required,
            granting.join(", ")
        )
    };

    AuthorizationExplanation {
        required,
        granted,
        reason,
    }
}
