//! # TaskDesk API Server
//!
//! Task tracking over HTTP: users register and log in, admins create and
//! assign tasks, assignees move them along and comment.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/taskdesk JWT_SECRET=... cargo run -p taskdesk-api
//! ```

use anyhow::Context;
use taskdesk_api::{
    app::{build_router, AppState},
    bootstrap,
    config::Config,
};
use taskdesk_shared::db::{migrations, pool};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskdesk_api=debug,taskdesk_shared=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("TaskDesk API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let db = pool::create_pool(pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await
    .context("Failed to connect to database")?;

    migrations::run_migrations(&db)
        .await
        .context("Failed to run database migrations")?;

    if let Some(admin) = &config.admin {
        bootstrap::ensure_admin(&db, admin).await?;
    }

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(db.clone(), config));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool::close_pool(db).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }

    tracing::info!("Shutdown signal received, draining connections...");
}
