// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`engine`] resolves commands, handles exclusion and spawns processes.
//! - [`runner`] drives a started process to completion and records it.
//! - [`sink`] defines where live output goes (`OutputSink`), with the
//!   channel-backed implementation used for HTTP responses.

pub mod engine;
pub mod runner;
pub mod sink;

pub use engine::{ExecutionEngine, ExecutionReport};
pub use runner::Execution;
pub use sink::{ChannelSink, OutputSink, OutputStream};
