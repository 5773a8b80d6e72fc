// src/registry/mod.rs

//! Command registry.
//!
//! Built once at startup from the configured command list and read-only
//! afterwards, so lookups need no synchronization. Each entry carries its own
//! exclusion lock (see [`command::RegisteredCommand`]).

pub mod command;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::ConfigFile;
use crate::errors::Result;

pub use command::{CommandDefinition, RegisteredCommand};

#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<RegisteredCommand>>,
}

impl CommandRegistry {
    /// Build the registry from definitions in configuration order.
    ///
    /// A later definition with an already-seen name replaces the earlier one;
    /// the collision is only logged.
    pub fn new(definitions: impl IntoIterator<Item = CommandDefinition>) -> Self {
        let mut commands = HashMap::new();
        for definition in definitions {
            let name = definition.name().to_string();
            let previous = commands.insert(
                name.clone(),
                Arc::new(RegisteredCommand::new(definition)),
            );
            if previous.is_some() {
                warn!(command = %name, "duplicate command name; later definition wins");
            } else {
                debug!(command = %name, "registered command");
            }
        }
        Self { commands }
    }

    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let definitions = cfg
            .commands
            .iter()
            .map(CommandDefinition::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(definitions))
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<RegisteredCommand>> {
        self.commands.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, argv: &[&str]) -> CommandDefinition {
        CommandDefinition::new(name, argv.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn later_duplicate_overwrites_earlier() {
        let registry = CommandRegistry::new(vec![
            def("dup", &["echo", "first"]),
            def("other", &["true"]),
            def("dup", &["echo", "second"]),
        ]);

        assert_eq!(registry.len(), 2);
        let dup = registry.lookup("dup").unwrap();
        assert_eq!(dup.definition().argv()[1], "second");
    }

    #[test]
    fn unknown_name_is_none() {
        let registry = CommandRegistry::new(vec![def("a", &["true"])]);
        assert!(registry.lookup("b").is_none());
        assert_eq!(registry.names(), vec!["a"]);
    }
}
