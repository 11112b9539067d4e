use patrimonio_auth::{Principal, Role, SessionToken};
use patrimonio_core::UserId;

/// Principal context for a request (resolved session).
///
/// Inserted by the session middleware; every protected route can rely on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
    token: SessionToken,
}

impl PrincipalContext {
    pub fn new(principal: Principal, token: SessionToken) -> Self {
        Self { principal, token }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn role(&self) -> Role {
        self.principal.role
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }
}
