// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod registry;
pub mod server;
pub mod status;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::config::loader::load_and_validate;
use crate::exec::ExecutionEngine;
use crate::registry::CommandRegistry;
use crate::server::Server;
use crate::status::StatusLedger;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - command registry and status ledger
/// - HTTP server (which also owns the status reaper)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let mut cfg = load_and_validate(&args.config)?;
    if let Some(port) = args.port {
        cfg.server.port = port;
    }

    let registry = CommandRegistry::from_config(&cfg)?;

    if args.dry_run {
        print_dry_run(&cfg, &registry);
        return Ok(());
    }

    info!(commands = ?registry.names(), "loaded command registry");

    let engine = ExecutionEngine::new(Arc::new(registry), Arc::new(StatusLedger::new()));
    let server = Server::bind(
        &cfg.server.listen_addr(),
        engine,
        cfg.server.reaper_interval_duration(),
    )
    .await?;

    // Ctrl-C → graceful shutdown.
    {
        let shutdown = server.shutdown_token();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl+C received; shutting down");
            shutdown.cancel();
        });
    }

    server.serve().await?;
    Ok(())
}

/// Simple dry-run output: print listener settings and the effective commands.
fn print_dry_run(cfg: &ConfigFile, registry: &CommandRegistry) {
    println!("command-server dry-run");
    println!("  server.listen = {}", cfg.server.listen_addr());
    println!("  server.reaper_interval = {}s", cfg.server.reaper_interval);
    println!();

    println!("commands ({}):", registry.len());
    for name in registry.names() {
        let Some(command) = registry.lookup(name) else {
            continue;
        };
        let def = command.definition();
        println!("  - {name}");
        println!("      argv: {:?}", def.argv());
        if !def.env().is_empty() {
            println!("      env: {:?}", def.env_pairs());
        }
        if def.is_exclusive() {
            println!("      exclusion: true");
        }
        if let Some(timeout) = def.timeout() {
            println!("      timeout: {}s", timeout.as_secs());
        }
    }

    debug!("dry-run complete (server not started)");
}
