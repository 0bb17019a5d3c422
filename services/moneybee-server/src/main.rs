//! MoneyBee Server
//!
//! One binary carries both halves of the service: the HTTP API in front
//! of the transfer engine, and the customer-event reactor draining the
//! bus in its own long-lived task.
//!
//! ```bash
//! # Start against a local stack
//! DATABASE_URL=postgresql://localhost/moneybee REDIS_URL=redis://localhost:6379 moneybee-server
//!
//! # Override the bind address
//! moneybee-server --host 127.0.0.1 --port 9000
//! ```

mod config;

use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use moneybee_api::{create_router, ApiConfig, AppState};
use moneybee_auth::{AdmissionConfig, AdmissionFilter, RedisValidityCache};
use moneybee_clients::{
    CollaboratorConfig, CollaboratorEndpoints, HttpCustomerDirectory, HttpFraudScreen,
    HttpKeyValidator, HttpRateSource,
};
use moneybee_db::Database;
use moneybee_domain::EnginePolicy;
use moneybee_engine::TransferEngine;
use moneybee_reactor::CustomerEventReactor;
use moneybee_types::routing;

use crate::config::ServerConfig;

/// MoneyBee transfer service
#[derive(Parser, Debug)]
#[command(name = "moneybee-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, env = "MONEYBEE_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "MONEYBEE_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "MONEYBEE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format (json, pretty)
    #[arg(long, env = "MONEYBEE_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    /// Skip running database migrations at startup
    #[arg(long)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut server_config = ServerConfig::load();
    if let Some(host) = args.host {
        server_config.server.host = host;
    }
    if let Some(port) = args.port {
        server_config.server.port = port;
    }
    server_config.logging.level = args.log_level;
    server_config.logging.format = args.log_format;

    init_logging(&server_config.logging);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting MoneyBee server"
    );

    // Databases
    let db = Arc::new(Database::connect(&server_config.database).await?);
    if !args.skip_migrations {
        db.migrate().await?;
    }
    let health = db.health_check().await?;
    if !health.healthy {
        anyhow::bail!(
            "backend health check failed (postgres={}, redis={})",
            health.postgres,
            health.redis
        );
    }

    // Collaborators
    let endpoints = CollaboratorEndpoints::from_env();
    let collaborator_config = CollaboratorConfig::from_env();
    let customers = Arc::new(HttpCustomerDirectory::new(
        endpoints.customer_url.clone(),
        collaborator_config.clone(),
    ));
    let fraud = Arc::new(HttpFraudScreen::new(
        endpoints.fraud_url.clone(),
        collaborator_config.clone(),
    ));
    let rates = Arc::new(HttpRateSource::new(
        endpoints.exchange_rate_url.clone(),
        collaborator_config.clone(),
    ));
    let key_validator = Arc::new(HttpKeyValidator::new(
        endpoints.auth_url.clone(),
        collaborator_config,
    ));

    // Engine
    let engine = Arc::new(TransferEngine::new(
        Arc::new(db.transfer_repo()),
        Arc::new(db.lock()),
        Arc::new(db.event_bus()),
        customers,
        fraud,
        rates,
        EnginePolicy::from_env(),
    ));

    // Reactor, fed from the bus subscription
    let reactor = Arc::new(CustomerEventReactor::new(
        engine.clone(),
        Arc::new(db.transfer_repo()),
    ));

    let (bus_tx, bus_rx) = mpsc::channel(256);
    let bus = db.event_bus();
    tokio::spawn(async move {
        if let Err(e) = bus.subscribe(routing::CUSTOMER_WILDCARD, bus_tx).await {
            tracing::error!(error = %e, "Bus subscription ended");
        }
    });
    {
        let reactor = reactor.clone();
        tokio::spawn(async move {
            reactor.run(bus_rx).await;
        });
    }

    // Admission filter
    let filter = Arc::new(AdmissionFilter::new(
        key_validator,
        Arc::new(RedisValidityCache::new(db.cache())),
        AdmissionConfig::default(),
    ));

    // Router
    let state = Arc::new(AppState::new(engine, reactor, Some(db)));
    let app = create_router(
        state,
        filter,
        ApiConfig {
            enable_cors: server_config.api.enable_cors,
            enable_trace: server_config.api.enable_trace,
        },
    );

    let addr = server_config.server.socket_addr()?;
    tracing::info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &config::LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber.with(fmt::layer().json().with_target(true)).init();
        }
        _ => {
            subscriber
                .with(fmt::layer().pretty().with_target(true))
                .init();
        }
    }
}

/// Resolve on ctrl-c or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
