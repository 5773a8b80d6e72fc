// src/server/mod.rs

//! HTTP front end.
//!
//! [`Server`] owns the listener, the shared [`AppState`] and the shutdown
//! token. Shutting down stops accepting connections, kills running commands
//! (each request's cancellation token is a child of the shutdown token) and
//! stops the status reaper.

pub mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::post;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::errors::Result;
use crate::exec::ExecutionEngine;
use crate::status::spawn_reaper;

/// State shared by all request handlers.
#[derive(Debug)]
pub struct AppState {
    pub engine: ExecutionEngine,
    pub shutdown: CancellationToken,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/new", post(handlers::new_command))
        .route("/status/{*id}", post(handlers::command_status))
        .route("/status/", post(handlers::missing_status_id))
        .route("/status", post(handlers::missing_status_id))
        .with_state(state)
}

#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    state: Arc<AppState>,
    reaper_interval: Duration,
}

impl Server {
    /// Bind the listener. Use port 0 for an ephemeral port.
    pub async fn bind(
        addr: &str,
        engine: ExecutionEngine,
        reaper_interval: Duration,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let state = Arc::new(AppState {
            engine,
            shutdown: CancellationToken::new(),
        });
        Ok(Self {
            listener,
            state,
            reaper_interval,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Token that stops the server when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.state.shutdown.clone()
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Serve until the shutdown token is cancelled.
    pub async fn serve(self) -> Result<()> {
        let shutdown = self.state.shutdown.clone();
        let reaper = spawn_reaper(
            Arc::clone(self.state.engine.ledger()),
            self.reaper_interval,
            shutdown.child_token(),
        );

        info!(addr = %self.listener.local_addr()?, "listening");

        let app = router(Arc::clone(&self.state));
        let signal = shutdown.clone();
        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move { signal.cancelled().await })
            .await?;

        shutdown.cancel();
        if let Err(e) = reaper.await {
            tracing::warn!(error = %e, "reaper task ended abnormally");
        }

        info!("server stopped");
        Ok(())
    }
}
