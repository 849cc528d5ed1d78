use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::Notify;

use registration_api::config::AppConfig;
use registration_api::hasher::BcryptHasher;
use registration_api::observability::Observability;
use registration_api::repository::PgUserRepository;
use registration_api::service::RegistrationService;
use registration_api::state::AppState;
use registration_api::validation::ValidationChain;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    let obs = Observability::init()?;
    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.connect_timeout)
        .max_lifetime(config.database.max_lifetime)
        .idle_timeout(config.database.idle_timeout)
        .connect(&config.database.url)
        .await?;

    sqlx::migrate!("../migrations").run(&pool).await?;

    tracing::info!("Database connected and migrations applied");

    let registrations = RegistrationService::new(
        Arc::new(PgUserRepository::new(pool.clone())),
        Arc::new(BcryptHasher),
        config.registration,
    );
    let chain = ValidationChain::registration(config.validation_policy);
    tracing::info!(stages = ?chain.stage_names(), policy = %chain.policy(), "validation chain ready");

    let state = AppState::new(chain, registrations, obs.registry);
    let app = registration_api::app(state, &config.server);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let stopping = Arc::new(Notify::new());
    let server = {
        let stopping = stopping.clone();
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal(stopping))
                .await
        }
    };

    tokio::select! {
        result = server => result?,
        _ = grace_expired(stopping, config.server.shutdown_grace) => {
            tracing::warn!("Shutdown grace period elapsed with requests still in flight");
        }
    }

    pool.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(stopping: Arc<Notify>) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
    stopping.notify_one();
}

async fn grace_expired(stopping: Arc<Notify>, grace: Duration) {
    stopping.notified().await;
    tokio::time::sleep(grace).await;
}
