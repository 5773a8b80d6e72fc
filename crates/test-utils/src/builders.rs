#![allow(dead_code)]

use std::collections::BTreeMap;

use command_server::config::{CommandConfig, ConfigFile, RawConfigFile, ServerSection};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                server: ServerSection::default(),
                commands: Vec::new(),
            },
        }
    }

    pub fn with_command(mut self, command: CommandConfig) -> Self {
        self.config.commands.push(command);
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.config.server.host = host.to_string();
        self
    }

    pub fn with_reaper_interval(mut self, secs: u64) -> Self {
        self.config.server.reaper_interval = secs;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `CommandConfig`.
pub struct CommandConfigBuilder {
    command: CommandConfig,
}

impl CommandConfigBuilder {
    pub fn new(name: &str, argv: &[&str]) -> Self {
        Self {
            command: CommandConfig {
                name: name.to_string(),
                command: argv.iter().map(|s| s.to_string()).collect(),
                env: BTreeMap::new(),
                exclusion: false,
                timeout: 0,
            },
        }
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.command.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn exclusion(mut self, val: bool) -> Self {
        self.command.exclusion = val;
        self
    }

    pub fn timeout(mut self, secs: u64) -> Self {
        self.command.timeout = secs;
        self
    }

    pub fn build(self) -> CommandConfig {
        self.command
    }
}
