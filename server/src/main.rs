//! SQLBook Server
//!
//! Serves one query session as JSON-RPC 2.0 over HTTP POST on `/`.
//! The server stops once a client calls `quit`, or on Ctrl-C.

mod config;
mod http;
mod telemetry;

use std::sync::Arc;

use clap::Parser;
use sqlbook_rpc::Dispatcher;
use sqlbook_session::{QuerySession, SessionConfig};
use sqlbook_source::SqliteSource;
use tokio::sync::Notify;
use tracing::info;

use crate::config::Args;
use crate::http::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    telemetry::init(&args.log_level)?;

    info!(database = %args.database, page_size = args.page_size, "starting sqlbook server");

    let source = SqliteSource::open(&args.database)?;
    let config = SessionConfig::new(args.page_size)?;
    let dispatcher = Dispatcher::new(QuerySession::with_config(source, config));

    let shutdown = Arc::new(Notify::new());
    let app = http::router(AppState::new(dispatcher, Arc::clone(&shutdown)));

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    info!("Awaiting requests on http://{}/", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("sqlbook server stopped");
    Ok(())
}

async fn shutdown_signal(quit: Arc<Notify>) {
    tokio::select! {
        _ = quit.notified() => {
            info!("session quit, shutting down");
        }
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                tracing::warn!(error = %err, "failed to listen for ctrl-c");
            }
            info!("interrupted, shutting down");
        }
    }
}
