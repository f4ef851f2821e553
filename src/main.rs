use lending_registry::{
    adapters::{
        memory::InMemoryStore,
        postgres::{PostgresCatalogStore, PostgresInventoryStore, PostgresLoanLedger},
    },
    api::{AppState, create_router},
    application::ServiceDependencies,
    config::{Config, StorageBackend},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lending_registry=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let policy = config.lending_policy();

    // ストアは起動時に一度だけ開く
    let (service_deps, pool) = match config.storage {
        StorageBackend::Postgres => {
            tracing::info!(max_connections = config.max_connections, "connecting to PostgreSQL");

            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(&config.database_url)
                .await?;

            sqlx::migrate!("./migrations").run(&pool).await?;

            let service_deps = ServiceDependencies {
                inventory_store: Arc::new(PostgresInventoryStore::new(
                    pool.clone(),
                    config.lock_timeout,
                )),
                catalog_store: Arc::new(PostgresCatalogStore::new(pool.clone())),
                loan_ledger: Arc::new(PostgresLoanLedger::new(pool.clone())),
                policy,
            };
            (service_deps, Some(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage, state is lost on shutdown");
            let store = Arc::new(InMemoryStore::with_lock_timeout(config.lock_timeout));
            (ServiceDependencies::from_store(store, policy), None)
        }
    };

    let app = create_router(Arc::new(AppState { service_deps }));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

async fn close_pool(pool: Option<PgPool>) {
    if let Some(pool) = pool {
        pool.close().await;
    }
}
