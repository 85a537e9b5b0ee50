#![allow(dead_code, unused_imports)]

use std::sync::Arc;
use std::time::Duration;

use checkpoint::exec::{CommandSpec, ExecutionSession, SessionOptions};

pub use checkpoint_test_utils::builders::CatalogBuilder;
pub use checkpoint_test_utils::{
    init_tracing, with_timeout, FakeFailure, FakeLauncher, FakeScript, RecordingSink,
};

/// Session options with a short floor so tests stay fast.
pub fn quick() -> SessionOptions {
    SessionOptions {
        min_visible: Duration::from_millis(20),
    }
}

pub fn session(feature: &str, sink: &Arc<RecordingSink>) -> ExecutionSession {
    ExecutionSession::new(feature, CommandSpec::new("fake"), sink.clone()).with_options(quick())
}

/// Index of the first line equal to `needle`.
pub fn position(lines: &[String], needle: &str) -> Option<usize> {
    lines.iter().position(|l| l == needle)
}
