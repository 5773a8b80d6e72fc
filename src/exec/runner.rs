// src/exec/runner.rs

//! Drives one started subprocess: forwards its output, enforces the timeout,
//! and records the result in the status ledger.

use std::fmt;
use std::io;
use std::process::ExitStatus;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::{OwnedMutexGuard, mpsc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::exec::sink::OutputSink;
use crate::registry::RegisteredCommand;
use crate::status::{ExecutionStatus, StatusLedger};
use crate::types::{KILLED_EXIT_CODE, StatusId, Termination};

const READ_CHUNK: usize = 8 * 1024;
const CHUNK_QUEUE: usize = 16;

/// A running subprocess together with everything needed to record it.
///
/// Holds the exclusion guard (if any) until [`Execution::run`] has recorded
/// the outcome. Dropping an `Execution` without running it kills the child.
pub struct Execution {
    id: StatusId,
    command: Arc<RegisteredCommand>,
    args: Vec<String>,
    child: Child,
    start_at: DateTime<Utc>,
    deadline: Option<Instant>,
    _guard: Option<OwnedMutexGuard<()>>,
    ledger: Arc<StatusLedger>,
}

impl fmt::Debug for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Execution")
            .field("id", &self.id)
            .field("command", &self.command.name())
            .field("args", &self.args)
            .field("start_at", &self.start_at)
            .finish_non_exhaustive()
    }
}

impl Execution {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: StatusId,
        command: Arc<RegisteredCommand>,
        args: Vec<String>,
        child: Child,
        start_at: DateTime<Utc>,
        deadline: Option<Instant>,
        guard: Option<OwnedMutexGuard<()>>,
        ledger: Arc<StatusLedger>,
    ) -> Self {
        Self {
            id,
            command,
            args,
            child,
            start_at,
            deadline,
            _guard: guard,
            ledger,
        }
    }

    pub fn id(&self) -> StatusId {
        self.id
    }

    /// Stream output into `sink` until the process ends, then record it.
    ///
    /// - stdout and stderr are forwarded chunk by chunk in arrival order.
    /// - If the timeout elapses or `cancel` fires, the process is killed and
    ///   the run ends as `TimedOut` / `Cancelled`. Output already written to
    ///   the sink stays there. A sink write that never completes does not
    ///   hold off either of them.
    /// - If the process already exited and only its pipes are still open
    ///   (a background grandchild holding them), the deadline or cancel stops
    ///   draining and the real exit status is kept.
    /// - A failing sink cancels the run.
    ///
    /// Every outcome is recorded before the exclusion lock is released.
    pub async fn run<S: OutputSink>(mut self, mut sink: S, cancel: CancellationToken) -> Termination {
        let (chunk_tx, mut chunk_rx) = mpsc::channel::<Bytes>(CHUNK_QUEUE);
        if let Some(stdout) = self.child.stdout.take() {
            tokio::spawn(pump(stdout, chunk_tx.clone()));
        }
        if let Some(stderr) = self.child.stderr.take() {
            tokio::spawn(pump(stderr, chunk_tx.clone()));
        }
        drop(chunk_tx);

        let deadline = self.deadline;
        let timeout = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(timeout);

        let mut exited: Option<Termination> = None;
        let mut drained = false;

        // The process counts as finished once it has exited and both pipes
        // hit EOF, so trailing output is never cut off.
        let termination = 'run: loop {
            if drained {
                if let Some(termination) = exited.take() {
                    break termination;
                }
            }

            tokio::select! {
                chunk = chunk_rx.recv(), if !drained => match chunk {
                    Some(chunk) => tokio::select! {
                        written = sink.write_chunk(chunk) => {
                            if let Err(e) = written {
                                debug!(
                                    command = %self.command.name(),
                                    status_id = self.id,
                                    error = %e,
                                    "output sink closed; cancelling run"
                                );
                                cancel.cancel();
                            }
                        }
                        _ = &mut timeout => {
                            break 'run self.stop(exited, Termination::TimedOut).await;
                        }
                        _ = cancel.cancelled() => {
                            break 'run self.stop(exited, Termination::Cancelled).await;
                        }
                    },
                    None => drained = true,
                },

                status_res = self.child.wait(), if exited.is_none() => {
                    exited = Some(self.exit_termination(status_res));
                }

                _ = &mut timeout => {
                    break 'run self.stop(exited, Termination::TimedOut).await;
                }

                _ = cancel.cancelled() => {
                    break 'run self.stop(exited, Termination::Cancelled).await;
                }
            }
        };

        self.record(termination);
        termination
    }

    /// End the run early because of `reason` (a timeout or cancellation).
    ///
    /// A process that already exited keeps its exit status; only the pipe
    /// draining is abandoned. Otherwise the process is killed.
    async fn stop(&mut self, exited: Option<Termination>, reason: Termination) -> Termination {
        if let Some(termination) = exited {
            debug!(
                command = %self.command.name(),
                status_id = self.id,
                ?reason,
                "process already exited; abandoning open output pipes"
            );
            return termination;
        }

        info!(
            command = %self.command.name(),
            status_id = self.id,
            ?reason,
            "killing process"
        );
        self.kill().await;
        reason
    }

    fn exit_termination(&self, status_res: io::Result<ExitStatus>) -> Termination {
        match status_res {
            Ok(status) => Termination::Exited {
                exit_code: status.code().unwrap_or(KILLED_EXIT_CODE),
                success: status.success(),
            },
            Err(e) => {
                warn!(
                    command = %self.command.name(),
                    status_id = self.id,
                    error = %e,
                    "waiting for process failed"
                );
                Termination::Exited {
                    exit_code: KILLED_EXIT_CODE,
                    success: false,
                }
            }
        }
    }

    async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            warn!(
                command = %self.command.name(),
                status_id = self.id,
                error = %e,
                "failed to kill child process"
            );
        }
    }

    fn record(&self, termination: Termination) {
        let finished_at = Utc::now();

        info!(
            command = %self.command.name(),
            status_id = self.id,
            exit_code = termination.exit_code(),
            success = termination.success(),
            ?termination,
            elapsed_ms = (finished_at - self.start_at).num_milliseconds(),
            "command finished"
        );

        self.ledger.record(
            self.id,
            ExecutionStatus {
                name: self.command.name().to_string(),
                args: self.args.clone(),
                success: termination.success(),
                exit_code: termination.exit_code(),
                start_at: self.start_at,
                finished_at,
            },
        );
    }
}

/// Copy everything from one subprocess pipe into the shared chunk queue.
async fn pump<R>(mut reader: R, tx: mpsc::Sender<Bytes>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    loop {
        buf.reserve(READ_CHUNK);
        match reader.read_buf(&mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(buf.split().freeze()).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!(error = %e, "reading subprocess output failed");
                break;
            }
        }
    }
}
