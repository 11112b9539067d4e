//! Infrastructure wiring: one inventory store shared by every service, plus
//! the session store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;

use patrimonio_auth::{InMemorySessionStore, Principal, Session, SessionError, SessionStore};
use patrimonio_infra::{
    AppConfig, AuditService, CatalogService, InMemoryInventoryStore, InventoryStore, MovementProcessor,
    PostgresInventoryStore,
};

/// Type-erased store so in-memory and Postgres wiring share one service type.
pub type DynInventoryStore = Arc<dyn InventoryStore>;

#[derive(Clone)]
pub struct AppServices {
    processor: MovementProcessor<DynInventoryStore>,
    catalog: CatalogService<DynInventoryStore>,
    audit: AuditService<DynInventoryStore>,
    sessions: Arc<dyn SessionStore>,
    session_ttl: Duration,
}

impl AppServices {
    pub fn new(store: DynInventoryStore, sessions: Arc<dyn SessionStore>, session_ttl: Duration) -> Self {
        Self {
            processor: MovementProcessor::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            audit: AuditService::new(store),
            sessions,
            session_ttl,
        }
    }

    /// In-memory wiring (dev/test).
    pub fn in_memory(session_ttl: Duration) -> Self {
        Self::new(
            Arc::new(InMemoryInventoryStore::new()),
            Arc::new(InMemorySessionStore::new()),
            session_ttl,
        )
    }

    pub fn processor(&self) -> &MovementProcessor<DynInventoryStore> {
        &self.processor
    }

    pub fn catalog(&self) -> &CatalogService<DynInventoryStore> {
        &self.catalog
    }

    pub fn audit(&self) -> &AuditService<DynInventoryStore> {
        &self.audit
    }

    pub fn sessions(&self) -> Arc<dyn SessionStore> {
        self.sessions.clone()
    }

    /// Open a session with the configured lifetime.
    pub fn issue_session(&self, principal: Principal) -> Result<Session, SessionError> {
        self.sessions.issue(principal, self.session_ttl, Utc::now())
    }
}

/// Build services from configuration: Postgres when a database is configured,
/// in-memory otherwise.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let session_ttl = config.session_ttl()?;

    let Some(db) = &config.database else {
        info!("using in-memory stores");
        return Ok(AppServices::in_memory(session_ttl));
    };

    let store = PostgresInventoryStore::connect(&db.url, db.max_connections).await?;
    info!(max_connections = db.max_connections, "connected to postgres; migrations applied");
    Ok(AppServices::new(
        Arc::new(store),
        Arc::new(InMemorySessionStore::new()),
        session_ttl,
    ))
}
