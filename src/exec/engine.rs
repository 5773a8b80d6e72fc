// src/exec/engine.rs

//! Execution engine: resolves a command, takes its exclusion lock, reserves a
//! status id and spawns the subprocess.

use std::process::Stdio;
use std::sync::Arc;

use chrono::Utc;
use tokio::process::Command;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::errors::{CommandServerError, Result};
use crate::exec::runner::Execution;
use crate::exec::sink::OutputSink;
use crate::registry::CommandRegistry;
use crate::status::StatusLedger;
use crate::types::{StatusId, Termination};

/// Result of a complete run through [`ExecutionEngine::execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionReport {
    pub id: StatusId,
    pub termination: Termination,
}

#[derive(Debug)]
pub struct ExecutionEngine {
    registry: Arc<CommandRegistry>,
    ledger: Arc<StatusLedger>,
}

impl ExecutionEngine {
    pub fn new(registry: Arc<CommandRegistry>, ledger: Arc<StatusLedger>) -> Self {
        Self { registry, ledger }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &Arc<StatusLedger> {
        &self.ledger
    }

    /// Start `name` with the caller's extra `args`.
    ///
    /// On success the subprocess is running and its status id is reserved;
    /// drive it to completion with [`Execution::run`]. For exclusive commands
    /// this waits for any in-flight run of the same command to finish first.
    ///
    /// Unknown names fail without reserving an id.
    pub async fn start(&self, name: &str, args: Vec<String>) -> Result<Execution> {
        let command = self
            .registry
            .lookup(name)
            .ok_or_else(|| CommandServerError::CommandNotFound(name.to_string()))?;

        let guard = command.acquire().await;
        if guard.is_some() {
            debug!(command = %name, "acquired exclusion lock");
        }

        let id = self.ledger.allocate();
        let definition = command.definition();

        let mut cmd = Command::new(definition.program());
        cmd.args(definition.resolve_args(&args))
            .env_clear()
            .envs(definition.env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let deadline = definition.timeout().map(|timeout| Instant::now() + timeout);
        let start_at = Utc::now();

        let child = cmd.spawn().map_err(|source| {
            error!(
                command = %name,
                status_id = id,
                program = %definition.program(),
                error = %source,
                "failed to start command"
            );
            CommandServerError::FailedToStart {
                command: name.to_string(),
                source,
            }
        })?;

        info!(
            command = %name,
            status_id = id,
            pid = child.id(),
            ?args,
            exclusive = definition.is_exclusive(),
            "command started"
        );

        Ok(Execution::new(
            id,
            command,
            args,
            child,
            start_at,
            deadline,
            guard,
            Arc::clone(&self.ledger),
        ))
    }

    /// Start and run a command to completion, streaming output into `sink`.
    pub async fn execute<S: OutputSink>(
        &self,
        name: &str,
        args: Vec<String>,
        sink: S,
        cancel: CancellationToken,
    ) -> Result<ExecutionReport> {
        let execution = self.start(name, args).await?;
        let id = execution.id();
        let termination = execution.run(sink, cancel).await;
        Ok(ExecutionReport { id, termination })
    }
}
