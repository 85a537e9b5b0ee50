// src/sink.rs

//! Log sink abstraction.
//!
//! The presentation layer implements [`LogSink`]; the execution core only
//! ever calls `emit` (once per logical line, banners included) and
//! `notify_done` (once per session, last).
//!
//! Implementations must be safe to call from many sessions and drainers at
//! once, and each `emit` must land as a whole line.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

/// Destination for user-visible log lines and completion signals.
pub trait LogSink: Send + Sync {
    fn emit(&self, line: &str);

    fn notify_done(&self, feature: &str);
}

impl<T: LogSink + ?Sized> LogSink for Arc<T> {
    fn emit(&self, line: &str) {
        (**self).emit(line)
    }

    fn notify_done(&self, feature: &str) {
        (**self).notify_done(feature)
    }
}

/// One event observed by a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Line(String),
    Done(String),
}

/// Forwards sink calls over an unbounded channel.
///
/// Each call becomes exactly one message, so lines never tear. Sends to a
/// closed receiver are dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LogSink for ChannelSink {
    fn emit(&self, line: &str) {
        if self.tx.send(SinkEvent::Line(line.to_string())).is_err() {
            debug!("log sink receiver dropped; discarding line");
        }
    }

    fn notify_done(&self, feature: &str) {
        if self.tx.send(SinkEvent::Done(feature.to_string())).is_err() {
            debug!(feature, "log sink receiver dropped; discarding done");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_preserves_call_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.emit("one");
        sink.emit("two");
        sink.notify_done("Netstat");

        assert_eq!(rx.try_recv().ok(), Some(SinkEvent::Line("one".into())));
        assert_eq!(rx.try_recv().ok(), Some(SinkEvent::Line("two".into())));
        assert_eq!(rx.try_recv().ok(), Some(SinkEvent::Done("Netstat".into())));
    }

    #[test]
    fn channel_sink_ignores_closed_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.emit("lost");
        sink.notify_done("lost");
    }
}
