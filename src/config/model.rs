// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [server]
/// port = 8080
///
/// [[commands]]
/// name = "deploy"
/// command = ["make", "deploy"]
/// env = { PATH = "/usr/bin:/bin" }
/// exclusion = true
/// timeout = 30
/// ```
///
/// This is the unvalidated form; turn it into a [`ConfigFile`] with
/// `ConfigFile::try_from`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Listener and background task settings from `[server]`.
    pub server: ServerSection,

    /// All commands from `[[commands]]`, in file order.
    #[serde(default)]
    pub commands: Vec<CommandConfig>,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>`, so every command here
/// has a non-empty argv.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub server: ServerSection,
    pub commands: Vec<CommandConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(server: ServerSection, commands: Vec<CommandConfig>) -> Self {
        Self { server, commands }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    /// Address to bind; defaults to all interfaces.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Seconds between two reaper sweeps of the status ledger.
    #[serde(default = "default_reaper_interval")]
    pub reaper_interval: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_reaper_interval() -> u64 {
    600
}

impl ServerSection {
    pub fn reaper_interval_duration(&self) -> Duration {
        Duration::from_secs(self.reaper_interval)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 0,
            reaper_interval: default_reaper_interval(),
        }
    }
}

/// One `[[commands]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandConfig {
    /// Name clients use in `POST /new`.
    pub name: String,

    /// Executable followed by its default arguments.
    ///
    /// Left defaulted here so validation can report which command is missing
    /// it instead of a bare serde error.
    #[serde(default, alias = "argv")]
    pub command: Vec<String>,

    /// Full environment of the subprocess. Nothing is inherited from the
    /// server.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Serialize all runs of this command.
    #[serde(default)]
    pub exclusion: bool,

    /// Timeout in whole seconds; `0` means no timeout.
    #[serde(default)]
    pub timeout: u64,
}

impl CommandConfig {
    pub fn timeout_duration(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }
}
