//! Configuration loading and representation.
//!
//! Everything comes from environment variables; unset variables fall back to
//! development defaults except `DATABASE_URL`, which persistent mode requires.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use patrimonio_observability::LogFormat;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// `Some` when `USE_PERSISTENT_STORES=true`.
    pub database: Option<DatabaseConfig>,
    pub session_ttl_minutes: i64,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub const DEFAULT_BIND_ADDR: &'static str = "0.0.0.0:8080";
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
    pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 480;
    /// Thirty days.
    pub const MAX_SESSION_TTL_MINUTES: i64 = 30 * 24 * 60;

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr: SocketAddr = parse_or(&lookup, "BIND_ADDR", Self::DEFAULT_BIND_ADDR.parse().ok())?;

        let persistent: bool = parse_or(&lookup, "USE_PERSISTENT_STORES", Some(false))?;
        let database = if persistent {
            let url = lookup("DATABASE_URL")
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            let max_connections: u32 =
                parse_or(&lookup, "DB_MAX_CONNECTIONS", Some(Self::DEFAULT_MAX_CONNECTIONS))?;
            if max_connections == 0 {
                return Err(invalid("DB_MAX_CONNECTIONS", "0", "must be at least 1"));
            }
            Some(DatabaseConfig { url, max_connections })
        } else {
            None
        };

        let session_ttl_minutes: i64 = parse_or(
            &lookup,
            "SESSION_TTL_MINUTES",
            Some(Self::DEFAULT_SESSION_TTL_MINUTES),
        )?;
        if !(1..=Self::MAX_SESSION_TTL_MINUTES).contains(&session_ttl_minutes) {
            return Err(invalid(
                "SESSION_TTL_MINUTES",
                &session_ttl_minutes.to_string(),
                &format!("must be between 1 and {}", Self::MAX_SESSION_TTL_MINUTES),
            ));
        }

        let log_format: LogFormat = match lookup("LOG_FORMAT") {
            None => LogFormat::default(),
            Some(raw) => raw
                .parse()
                .map_err(|reason: String| invalid("LOG_FORMAT", &raw, &reason))?,
        };

        Ok(Self {
            bind_addr,
            database,
            session_ttl_minutes,
            log_format,
        })
    }
}

impl AppConfig {
    /// Session lifetime as a duration.
    pub fn session_ttl(&self) -> Result<Duration, ConfigError> {
        Duration::try_minutes(self.session_ttl_minutes)
            .filter(|ttl| *ttl > Duration::zero())
            .ok_or_else(|| {
                invalid(
                    "SESSION_TTL_MINUTES",
                    &self.session_ttl_minutes.to_string(),
                    "out of range",
                )
            })
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: Option<T>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| invalid(key, &raw, &e.to_string())),
        None => default.ok_or(ConfigError::Missing(key)),
    }
}
