// src/registry/command.rs

//! Static command definitions and their per-command exclusion lock.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::CommandConfig;
use crate::errors::{CommandServerError, Result};

/// Immutable description of one runnable command.
///
/// Only built through [`CommandDefinition::new`], which rejects an empty
/// argv, so `program()` always has an executable to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDefinition {
    name: String,
    argv: Vec<String>,
    env: BTreeMap<String, String>,
    exclusive: bool,
    timeout: Option<Duration>,
}

impl CommandDefinition {
    pub fn new(name: impl Into<String>, argv: Vec<String>) -> Result<Self> {
        let name = name.into();
        if argv.first().is_none_or(|program| program.is_empty()) {
            return Err(CommandServerError::ConfigError(format!(
                "command '{name}' needs a non-empty executable"
            )));
        }
        Ok(Self {
            name,
            argv,
            env: BTreeMap::new(),
            exclusive: false,
            timeout: None,
        })
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// `None` (or a zero duration) means no timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Executable first, then default arguments. Never empty.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// Default arguments followed by the caller's extra arguments.
    pub fn resolve_args(&self, extra: &[String]) -> Vec<String> {
        self.argv[1..].iter().chain(extra.iter()).cloned().collect()
    }

    /// Environment as `KEY=VALUE` pairs, in key order.
    pub fn env_pairs(&self) -> Vec<String> {
        self.env.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }
}

impl TryFrom<&CommandConfig> for CommandDefinition {
    type Error = CommandServerError;

    fn try_from(cfg: &CommandConfig) -> Result<Self> {
        Ok(Self::new(cfg.name.clone(), cfg.command.clone())?
            .with_env(cfg.env.clone())
            .with_exclusive(cfg.exclusion)
            .with_timeout(cfg.timeout_duration()))
    }
}

/// A registry entry: the definition plus the lock that serializes it when
/// `exclusive` is set.
///
/// The lock is created together with the entry and never replaced.
#[derive(Debug)]
pub struct RegisteredCommand {
    definition: CommandDefinition,
    lock: Arc<Mutex<()>>,
}

impl RegisteredCommand {
    pub fn new(definition: CommandDefinition) -> Self {
        Self {
            definition,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn definition(&self) -> &CommandDefinition {
        &self.definition
    }

    pub fn name(&self) -> &str {
        self.definition.name()
    }

    /// Wait for the exclusion lock if this command is exclusive.
    ///
    /// Returns `None` for non-exclusive commands, which never touch the lock.
    pub async fn acquire(&self) -> Option<OwnedMutexGuard<()>> {
        if !self.definition.exclusive {
            return None;
        }
        Some(Arc::clone(&self.lock).lock_owned().await)
    }
}
