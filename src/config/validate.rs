// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{CommandServerError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = CommandServerError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.server, raw.commands))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_server_section(cfg)?;
    validate_commands(cfg)?;
    Ok(())
}

fn validate_server_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.server.reaper_interval == 0 {
        return Err(CommandServerError::ConfigError(
            "[server].reaper_interval must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

// Duplicate names are deliberately not rejected here; the registry keeps the
// last one and warns.
fn validate_commands(cfg: &RawConfigFile) -> Result<()> {
    for (index, command) in cfg.commands.iter().enumerate() {
        if command.name.trim().is_empty() {
            return Err(CommandServerError::ConfigError(format!(
                "command #{} has an empty name",
                index + 1
            )));
        }
        if command.command.is_empty() {
            return Err(CommandServerError::ConfigError(format!(
                "command '{}' has an empty `command` list",
                command.name
            )));
        }
        if command.command[0].is_empty() {
            return Err(CommandServerError::ConfigError(format!(
                "command '{}' has an empty executable",
                command.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(toml_src)?;
        ConfigFile::try_from(raw)
    }

    #[test]
    fn accepts_minimal_config() {
        let cfg = parse(
            r#"
[server]
port = 9000

[[commands]]
name = "hello"
command = ["echo", "hello"]
"#,
        )
        .unwrap();

        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.reaper_interval, 600);
        assert_eq!(cfg.commands.len(), 1);
        assert!(cfg.commands[0].timeout_duration().is_none());
        assert!(!cfg.commands[0].exclusion);
    }

    #[test]
    fn argv_alias_is_accepted() {
        let cfg = parse(
            r#"
[server]
port = 1

[[commands]]
name = "x"
argv = ["true"]
timeout = 5
"#,
        )
        .unwrap();

        assert_eq!(cfg.commands[0].command, vec!["true".to_string()]);
        assert_eq!(
            cfg.commands[0].timeout_duration(),
            Some(std::time::Duration::from_secs(5))
        );
    }

    #[test]
    fn missing_command_list_is_rejected_with_name() {
        let err = parse(
            r#"
[server]
port = 1

[[commands]]
name = "broken"
"#,
        )
        .unwrap_err();

        match err {
            CommandServerError::ConfigError(msg) => assert!(msg.contains("broken")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn zero_reaper_interval_is_rejected() {
        let err = parse(
            r#"
[server]
port = 1
reaper_interval = 0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CommandServerError::ConfigError(_)));
    }

    #[test]
    fn duplicate_names_are_not_a_config_error() {
        let cfg = parse(
            r#"
[server]
port = 1

[[commands]]
name = "dup"
command = ["echo", "first"]

[[commands]]
name = "dup"
command = ["echo", "second"]
"#,
        )
        .unwrap();
        assert_eq!(cfg.commands.len(), 2);
    }
}
