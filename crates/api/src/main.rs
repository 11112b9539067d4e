use std::sync::Arc;

use anyhow::Context;

use patrimonio_auth::{Principal, Role, SessionStore};
use patrimonio_core::UserId;
use patrimonio_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    patrimonio_observability::init(config.log_format);

    let services = Arc::new(patrimonio_api::app::build_services(&config).await?);

    // Sessions are normally opened by the identity front-end; this hook hands
    // an operator a first token on an otherwise empty session store.
    if let Ok(raw) = std::env::var("BOOTSTRAP_ROLE") {
        let role: Role = raw.parse()?;
        let session = services.issue_session(Principal::new(UserId::new(1), role))?;
        tracing::warn!(role = %role, expires_at = %session.expires_at, "bootstrap session issued");
        println!("{}", session.token);
    }

    let sessions = services.sessions();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            tick.tick().await;
            match sessions.purge_expired(chrono::Utc::now()) {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "expired sessions purged"),
                Err(e) => tracing::error!(error = %e, "session purge failed"),
            }
        }
    });

    let app = patrimonio_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
