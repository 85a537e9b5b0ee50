use std::sync::Mutex;
use std::time::Instant;

use checkpoint::sink::{LogSink, SinkEvent};
use tokio::sync::Notify;

/// A sink that records every event with the instant it arrived.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(Instant, SinkEvent)>>,
    changed: Notify,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn timed_events(&self) -> Vec<(Instant, SinkEvent)> {
        self.events.lock().unwrap().clone()
    }

    /// Only the emitted lines, in arrival order.
    pub fn lines(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Line(line) => Some(line),
                SinkEvent::Done(_) => None,
            })
            .collect()
    }

    pub fn done_count(&self, feature: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SinkEvent::Done(f) if f == feature))
            .count()
    }

    /// Wait until `feature` has signalled `done` at least `count` times.
    pub async fn wait_for_done(&self, feature: &str, count: usize) {
        loop {
            let changed = self.changed.notified();
            if self.done_count(feature) >= count {
                return;
            }
            changed.await;
        }
    }

    fn record(&self, event: SinkEvent) {
        self.events.lock().unwrap().push((Instant::now(), event));
        self.changed.notify_waiters();
    }
}

impl LogSink for RecordingSink {
    fn emit(&self, line: &str) {
        self.record(SinkEvent::Line(line.to_string()));
    }

    fn notify_done(&self, feature: &str) {
        self.record(SinkEvent::Done(feature.to_string()));
    }
}
