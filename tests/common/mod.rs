#![allow(dead_code)]

use std::sync::Arc;

pub use command_server_test_utils::builders::{CommandConfigBuilder, ConfigFileBuilder};
pub use command_server_test_utils::recording_sink::{RecordingSink, StalledSink};
pub use command_server_test_utils::{TestServer, engine_from_config, init_tracing, with_timeout};

use command_server::exec::ExecutionEngine;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Engine with the commands most tests need.
pub fn standard_engine() -> Arc<ExecutionEngine> {
    let cfg = ConfigFileBuilder::new()
        .with_command(CommandConfigBuilder::new("test", &["echo", "ok"]).build())
        .with_command(
            CommandConfigBuilder::new("timeout", &["sleep", "2"])
                .timeout(1)
                .build(),
        )
        .with_command(CommandConfigBuilder::new("unknown", &["command-not-found"]).build())
        .with_command(
            CommandConfigBuilder::new("sequence", &["sleep", "0.3"])
                .exclusion(true)
                .build(),
        )
        .with_command(CommandConfigBuilder::new("parallel", &["sleep", "0.5"]).build())
        .with_command(
            CommandConfigBuilder::new("both-streams", &["sh", "-c", "echo out; echo err 1>&2"])
                .build(),
        )
        .with_command(CommandConfigBuilder::new("fail", &["sh", "-c", "exit 3"]).build())
        .with_command(
            CommandConfigBuilder::new("env", &["sh", "-c", "echo \"$GREETING:${HOME:-unset}\""])
                .env("GREETING", "hello")
                .build(),
        )
        .with_command(
            CommandConfigBuilder::new("stall", &["sh", "-c", "echo hi; sleep 5"])
                .timeout(1)
                .build(),
        )
        .with_command(CommandConfigBuilder::new("chatty", &["sh", "-c", "echo hi; sleep 5"]).build())
        .with_command(
            CommandConfigBuilder::new("background", &["sh", "-c", "sleep 3 & echo hi"])
                .timeout(1)
                .build(),
        )
        .with_command(CommandConfigBuilder::new("killed", &["sh", "-c", "kill -9 $$"]).build())
        .build();
    Arc::new(engine_from_config(&cfg))
}
