//! `patrimonio-auth`: sessions, roles and capability checks.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod session;

pub use authorize::{AuthorizationExplanation, AuthzError, authorize, explain_authorization};
pub use permissions::Capability;
pub use principal::Principal;
pub use roles::{Role, UnknownRole};
pub use session::{InMemorySessionStore, Session, SessionError, SessionStore, SessionToken};
