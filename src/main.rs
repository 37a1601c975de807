//! Snippetbox server.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ net (bind / TLS) ──▶ http::server ──▶ standard chain
//!                                                    Recover
//!                                                    RequestLog
//!                                                    CommonHeaders
//!                                                        │
//!                                                        ▼
//!                                                 routing::Router
//!                                           ┌────────────┼─────────────┐
//!                                        /static      /ping        dynamic chain
//!                                                                  LoadAndSave
//!                                                                  CsrfGuard
//!                                                                  Authenticate
//!                                                                  [RequireGuest |
//!                                                                   RequireAuthentication]
//!                                                                      │
//!                                                                      ▼
//!                                                                   handlers
//! ```

use std::sync::Arc;

use clap::Parser;

use snippetbox::config::Cli;
use snippetbox::lifecycle::{spawn_signal_listener, Shutdown};
use snippetbox::net::{listener, tls};
use snippetbox::observability::{logging, metrics};
use snippetbox::session::cleanup::spawn_cleanup;
use snippetbox::{AppState, HttpServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config()?;

    logging::init_tracing(&config.observability.log_level);
    tracing::info!("snippetbox v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        address = %config.listener.address,
        session_lifetime = ?config.session.lifetime,
        tls = config.listener.tls.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let addr = listener::parse_address(&config.listener.address)?;
    let tls_config = config.listener.tls.clone();
    let cleanup_interval = config.session.cleanup_interval;

    let state = Arc::new(AppState::in_memory(config)?);
    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());
    let sweeper = spawn_cleanup(
        Arc::clone(state.sessions.store()),
        cleanup_interval,
        shutdown.subscribe(),
    );

    let server = HttpServer::new(state);
    match tls_config {
        Some(tls_config) => {
            let rustls = tls::load_tls_config(&tls_config).await?;
            server.run_tls(addr, rustls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = listener::bind(addr).await?;
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    // The server can also stop on its own (e.g. accept failure).
    shutdown.trigger();
    let _ = sweeper.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
