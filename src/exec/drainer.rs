// src/exec/drainer.rs

//! Stream drainer: forward one child output stream to the sink, line by line.

use std::future::Future;
use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::sink::LogSink;
use crate::types::StreamKind;

/// Longest line forwarded as one emit. Longer runs without a newline are
/// split into several lines of at most this many bytes.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Read `stream` until end-of-input, emitting every line to `sink`.
///
/// Lines are split on `\n` with a trailing `\r` removed. Bytes that are not
/// valid UTF-8 are replaced rather than dropped. A final line without a
/// newline is still forwarded. A read error ends the drain early.
///
/// Returns the number of lines forwarded.
pub async fn drain<R>(stream: R, kind: StreamKind, sink: &dyn LogSink) -> usize
where
    R: AsyncRead + Unpin,
{
    drain_until(stream, kind, sink, std::future::pending()).await
}

/// Like [`drain`], but gives up as soon as `stop` resolves. Bytes already
/// read for an unfinished line are still forwarded.
pub async fn drain_until<R, F>(stream: R, kind: StreamKind, sink: &dyn LogSink, stop: F) -> usize
where
    R: AsyncRead + Unpin,
    F: Future<Output = ()>,
{
    let mut reader = BufReader::new(stream);
    let mut buf: Vec<u8> = Vec::with_capacity(256);
    let mut forwarded = 0usize;
    tokio::pin!(stop);

    loop {
        buf.clear();
        tokio::select! {
            res = read_line_capped(&mut reader, &mut buf) => match res {
                Ok(false) => break,
                Ok(true) => {
                    sink.emit(&format_line(kind, &buf));
                    forwarded += 1;
                }
                Err(e) => {
                    warn!(stream = %kind, error = %e, "read error while draining; stopping");
                    break;
                }
            },

            _ = &mut stop => {
                if !buf.is_empty() {
                    sink.emit(&format_line(kind, &buf));
                    forwarded += 1;
                }
                debug!(stream = %kind, "drain stopped before end of input");
                break;
            }
        }
    }

    debug!(stream = %kind, lines = forwarded, "stream drained");
    forwarded
}

/// Run [`drain_until`] as its own Tokio task.
///
/// The join handle resolving is the drainer's completion signal.
pub fn spawn_drainer<R, F>(
    stream: R,
    kind: StreamKind,
    sink: Arc<dyn LogSink>,
    stop: F,
) -> JoinHandle<usize>
where
    R: AsyncRead + Unpin + Send + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move { drain_until(stream, kind, sink.as_ref(), stop).await })
}

/// Append one line (newline included) to `buf`, stopping early once
/// [`MAX_LINE_BYTES`] have been collected. `Ok(false)` means end-of-input
/// with nothing read.
async fn read_line_capped<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(!buf.is_empty());
        }

        let room = MAX_LINE_BYTES - buf.len();
        let window = &available[..available.len().min(room)];
        let (used, done) = match window.iter().position(|b| *b == b'\n') {
            Some(i) => (i + 1, true),
            None => (window.len(), buf.len() + window.len() >= MAX_LINE_BYTES),
        };
        buf.extend_from_slice(&window[..used]);
        reader.consume(used);

        if done {
            return Ok(true);
        }
    }
}

fn format_line(kind: StreamKind, raw: &[u8]) -> String {
    let mut end = raw.len();
    if end > 0 && raw[end - 1] == b'\n' {
        end -= 1;
        if end > 0 && raw[end - 1] == b'\r' {
            end -= 1;
        }
    }
    let text = String::from_utf8_lossy(&raw[..end]);
    format!("{}{}", kind.line_prefix(), text)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Lines(Mutex<Vec<String>>);

    impl LogSink for Lines {
        fn emit(&self, line: &str) {
            self.0.lock().unwrap().push(line.to_string());
        }

        fn notify_done(&self, _feature: &str) {}
    }

    impl Lines {
        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    #[tokio::test]
    async fn forwards_partial_final_line() {
        let sink = Lines::default();
        let n = drain(Cursor::new(b"a\nb\nc".to_vec()), StreamKind::Stdout, &sink).await;
        assert_eq!(n, 3);
        assert_eq!(sink.take(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn strips_crlf_and_tags_stderr() {
        let sink = Lines::default();
        drain(Cursor::new(b"oops\r\n\r\n".to_vec()), StreamKind::Stderr, &sink).await;
        assert_eq!(sink.take(), vec!["[ERR] oops", "[ERR] "]);
    }

    #[tokio::test]
    async fn empty_stream_forwards_nothing() {
        let sink = Lines::default();
        let n = drain(Cursor::new(Vec::new()), StreamKind::Stdout, &sink).await;
        assert_eq!(n, 0);
        assert!(sink.take().is_empty());
    }

    #[tokio::test]
    async fn overlong_lines_are_split_at_the_cap() {
        let sink = Lines::default();
        let mut raw = vec![b'a'; MAX_LINE_BYTES * 2 + 10];
        raw.extend_from_slice(b"\nnext\n");

        let n = drain(Cursor::new(raw), StreamKind::Stdout, &sink).await;

        let lines = sink.take();
        assert_eq!(n, 4);
        assert_eq!(lines[0].len(), MAX_LINE_BYTES);
        assert_eq!(lines[1].len(), MAX_LINE_BYTES);
        assert_eq!(lines[2], "a".repeat(10));
        assert_eq!(lines[3], "next");
    }

    #[tokio::test]
    async fn stop_signal_ends_an_open_stream() {
        let sink = Lines::default();
        let (mut writer, reader) = tokio::io::duplex(1024);
        tokio::io::AsyncWriteExt::write_all(&mut writer, b"first\nhalf").await.unwrap();

        let stop = tokio::time::sleep(std::time::Duration::from_millis(50));
        let n = drain_until(reader, StreamKind::Stdout, &sink, stop).await;

        // `writer` is still alive, so only the stop signal ended the drain.
        assert_eq!(n, 2);
        assert_eq!(sink.take(), vec!["first", "half"]);
        drop(writer);
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let sink = Lines::default();
        drain(Cursor::new(vec![b'o', b'k', 0xff, b'\n']), StreamKind::Stdout, &sink).await;
        assert_eq!(sink.take(), vec!["ok\u{fffd}"]);
    }
}
