//! explorer-api - participant/biosample metadata service
//!
//! `serve` (default) runs the HTTP server; `create-user` bootstraps an
//! account so the first login is possible.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use explorer_common::api::auth::load_shared_secret;
use explorer_common::config::{resolve_database_path, TomlConfig};
use explorer_common::db::init_database;
use explorer_api::{build_router, db, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for explorer-api
#[derive(Parser, Debug)]
#[command(name = "explorer-api")]
#[command(about = "Participant and biosample metadata service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// SQLite database file (overrides config)
    #[arg(short, long, value_name = "FILE")]
    database: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve,

    /// Create a user account
    CreateUser {
        #[arg(long)]
        email: String,

        #[arg(long)]
        username: String,

        #[arg(long, env = "EXPLORER_USER_PASSWORD")]
        password: String,

        /// Grant administrator rights
        #[arg(long)]
        admin: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Loaded before tracing so the configured log level applies; the source
    // is logged once the subscriber is up
    let (config, config_source) =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any database work
    info!(
        "Starting explorer-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    config_source.log();

    let db_path = resolve_database_path(args.database.as_deref(), &config);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let result = match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(pool.clone(), &config, args.port).await,
        Command::CreateUser {
            email,
            username,
            password,
            admin,
        } => {
            let user = db::users::create_user(&pool, &email, &username, &password, admin)
                .await
                .context("Failed to create user")?;
            info!(user_id = user.id, email = %user.email, admin = user.is_admin, "User created");
            Ok(())
        }
    };

    pool.close().await;
    result
}

async fn serve(pool: sqlx::SqlitePool, config: &TomlConfig, port: Option<u16>) -> Result<()> {
    let shared_secret = match load_shared_secret(&pool).await {
        Ok(0) => {
            warn!("API authentication disabled (shared_secret = 0)");
            0
        }
        Ok(secret) => {
            info!("Loaded shared secret for API authentication");
            secret
        }
        Err(e) => {
            error!("Failed to load shared secret: {}", e);
            return Err(anyhow::anyhow!("Failed to load shared secret: {}", e));
        }
    };

    let state = AppState::from_config(pool, shared_secret, config);
    let auto_create: Vec<&str> = state.auto_create.kinds().map(|k| k.as_str()).collect();
    info!(?auto_create, "Import auto-creation allow-list");

    let app = build_router(state);

    let port = port.unwrap_or(config.port);
    let addr: SocketAddr = format!("{}:{}", config.bind_address, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind_address, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("explorer-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
