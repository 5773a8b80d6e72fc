pub mod builders;
pub mod recording_sink;

use std::net::SocketAddr;
use std::sync::{Arc, Once};
use std::time::Duration;

use command_server::config::ConfigFile;
use command_server::exec::ExecutionEngine;
use command_server::registry::CommandRegistry;
use command_server::server::{AppState, Server};
use command_server::status::StatusLedger;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Build an engine with a fresh ledger from a validated config.
pub fn engine_from_config(cfg: &ConfigFile) -> ExecutionEngine {
    let registry = CommandRegistry::from_config(cfg).expect("validated config builds a registry");
    ExecutionEngine::new(Arc::new(registry), Arc::new(StatusLedger::new()))
}

/// A server listening on an ephemeral localhost port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: Arc<AppState>,
    pub shutdown: CancellationToken,
    pub handle: JoinHandle<command_server::errors::Result<()>>,
}

impl TestServer {
    pub async fn start(cfg: &ConfigFile) -> anyhow::Result<Self> {
        let server = Server::bind(
            "127.0.0.1:0",
            engine_from_config(cfg),
            cfg.server.reaper_interval_duration(),
        )
        .await?;
        let addr = server.local_addr()?;
        let state = server.state();
        let shutdown = server.shutdown_token();
        let handle = tokio::spawn(server.serve());
        Ok(Self {
            addr,
            state,
            shutdown,
            handle,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn stop(self) -> anyhow::Result<()> {
        self.shutdown.cancel();
        self.handle.await??;
        Ok(())
    }
}
