//! Server-side sessions with opaque tokens.
//!
//! A token is a random UUID with no embedded claims; everything about the
//! session lives in the store and expires at an explicit instant.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::Principal;

/// Opaque bearer token identifying a session.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(Uuid);

impl SessionToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl core::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for SessionToken {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| SessionError::MalformedToken)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: SessionToken,
    pub principal: Principal,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("malformed session token")]
    MalformedToken,

    #[error("unknown session")]
    Unknown,

    #[error("session has expired")]
    Expired,

    #[error("invalid session lifetime: ttl must be positive and expire within the representable range")]
    InvalidTtl,

    #[error("session store failure: {0}")]
    Storage(String),
}

/// Storage boundary for sessions.
pub trait SessionStore: Send + Sync {
    fn issue(&self, principal: Principal, ttl: Duration, now: DateTime<Utc>) -> Result<Session, SessionError>;

    /// Resolve a token to its principal. Expired sessions are evicted.
    fn resolve(&self, token: &SessionToken, now: DateTime<Utc>) -> Result<Principal, SessionError>;

    /// Returns whether a session was removed.
    fn revoke(&self, token: &SessionToken) -> Result<bool, SessionError>;

    /// Drop every session expired at `now`; returns how many were removed.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, SessionError>;
}

impl<S> SessionStore for Arc<S>
where
    S: SessionStore + ?Sized,
{
    fn issue(&self, principal: Principal, ttl: Duration, now: DateTime<Utc>) -> Result<Session, SessionError> {
        (**self).issue(principal, ttl, now)
    }

    fn resolve(&self, token: &SessionToken, now: DateTime<Utc>) -> Result<Principal, SessionError> {
        (**self).resolve(token, now)
    }

    fn revoke(&self, token: &SessionToken) -> Result<bool, SessionError> {
        (**self).revoke(token)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, SessionError> {
        (**self).purge_expired(now)
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionToken, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> SessionError {
    SessionError::Storage("lock poisoned".to_string())
}

impl SessionStore for InMemorySessionStore {
    fn issue(&self, principal: Principal, ttl: Duration, now: DateTime<Utc>) -> Result<Session, SessionError> {
        if ttl <= Duration::zero() {
            return Err(SessionError::InvalidTtl);
        }

        let expires_at = now.checked_add_signed(ttl).ok_or(SessionError::InvalidTtl)?;

        let session = Session {
            token: SessionToken::generate(),
            principal,
            issued_at: now,
            expires_at,
        };

        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.insert(session.token, session.clone());
        tracing::debug!(user_id = %session.principal.user_id, role = %session.principal.role, "session issued");
        Ok(session)
    }

    fn resolve(&self, token: &SessionToken, now: DateTime<Utc>) -> Result<Principal, SessionError> {
        {
            let sessions = self.sessions.read().map_err(poisoned)?;
            match sessions.get(token) {
                None => return Err(SessionError::Unknown),
                Some(session) if !session.is_expired(now) => return Ok(session.principal.clone()),
                Some(_) => {}
            }
        }

        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.remove(token);
        Err(SessionError::Expired)
    }

    fn revoke(&self, token: &SessionToken) -> Result<bool, SessionError> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        Ok(sessions.remove(token).is_some())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, SessionError> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        Ok(before - sessions.len())
    }
}
