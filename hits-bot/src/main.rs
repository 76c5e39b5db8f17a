//! hits-bot - personal sticker pack bot
//!
//! Receives updates by webhook (axum) or long polling and keeps one pack
//! per user and category in sync with what the user sends.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use hits_common::db::init_database;
use hits_common::DeployMode;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hits_bot::config::{load_config, Args};
use hits_bot::polling::run_polling;
use hits_bot::telegram::TelegramClient;
use hits_bot::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hits_bot=info,hits_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting hits-bot v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = load_config(Args::parse()).context("Invalid configuration")?;
    info!(
        mode = %config.deploy_mode,
        policy = ?config.removal_policy,
        "Configuration loaded"
    );

    let pool = init_database(&config.database_url)
        .await
        .context("Failed to open database")?;

    let client = Arc::new(
        TelegramClient::new(&config.api_base_url, &config.api_token)
            .context("Failed to build Bot API client")?,
    );

    let state = AppState::new(pool, config, client.clone());

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_shutdown_signal(shutdown.clone()));

    match state.config.deploy_mode {
        DeployMode::Webhook => run_webhook(state, &client, shutdown).await,
        DeployMode::Polling => run_polling(state, &client, shutdown)
            .await
            .context("Long polling failed"),
    }
}

async fn run_webhook(
    state: AppState,
    client: &TelegramClient,
    shutdown: CancellationToken,
) -> Result<()> {
    let webhook_url = state
        .config
        .webhook_url()
        .context("Webhook mode requires a domain")?;
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on {}", addr);

    let delay = state.config.startup_delay;
    if !delay.is_zero() {
        info!(delay_secs = delay.as_secs(), "Waiting before webhook registration");
        tokio::time::sleep(delay).await;
    }

    client
        .set_webhook(&webhook_url)
        .await
        .context("Failed to register webhook")?;
    info!(path = %state.config.webhook_path, "Webhook registered");

    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .context("Server error")?;

    if let Err(e) = client.delete_webhook().await {
        warn!(error = %e, "Failed to delete webhook on shutdown");
    } else {
        info!("Webhook deleted");
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Cancel `shutdown` on Ctrl+C or SIGTERM
async fn watch_shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }

    shutdown.cancel();
}
