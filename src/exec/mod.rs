// src/exec/mod.rs

//! Command execution and log streaming core.
//!
//! - [`command_spec`] describes one external command.
//! - [`process`] starts it behind the [`ProcessLauncher`] seam and exposes
//!   its stdout / stderr streams.
//! - [`drainer`] forwards one stream to the log sink, line by line.
//! - [`session`] coordinates the launcher and both drainers for one feature
//!   run, from start banner to `done`.

pub mod command_spec;
pub mod drainer;
pub mod process;
pub mod session;

pub use command_spec::CommandSpec;
pub use drainer::{drain, drain_until, spawn_drainer, MAX_LINE_BYTES};
pub use process::{
    ChildHandle, ExitReport, OutputStream, ProcessLauncher, SpawnedProcess, TokioLauncher,
};
pub use session::{
    ExecutionSession, SessionOptions, SessionReport, SessionState, BANNER_SEPARATOR,
    CANCELLED_BANNER, KILL_DRAIN_GRACE, MIN_VISIBLE_DURATION, SUCCESS_BANNER,
};
