use std::io::Cursor;
use std::sync::Arc;

use checkpoint::exec::drain;
use checkpoint::types::StreamKind;
use checkpoint_test_utils::RecordingSink;
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

// Build the raw stream: every line newline-terminated, optionally with CRLF,
// and optionally leaving the final line unterminated.
fn encode(lines: &[String], crlf: bool, terminate_last: bool) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        out.extend_from_slice(line.as_bytes());
        let last = i + 1 == lines.len();
        if !last || terminate_last || line.is_empty() {
            if crlf {
                out.push(b'\r');
            }
            out.push(b'\n');
        }
    }
    out
}

proptest! {
    #[test]
    fn drained_lines_keep_order_and_content(
        lines in proptest::collection::vec("[^\r\n]{0,24}", 0..40),
        crlf in any::<bool>(),
        terminate_last in any::<bool>(),
        stderr in any::<bool>(),
    ) {
        let kind = if stderr { StreamKind::Stderr } else { StreamKind::Stdout };
        let raw = encode(&lines, crlf, terminate_last);
        let sink = Arc::new(RecordingSink::new());

        let forwarded = runtime().block_on(drain(Cursor::new(raw), kind, sink.as_ref()));

        let expected: Vec<String> = lines
            .iter()
            .map(|l| format!("{}{}", kind.line_prefix(), l))
            .collect();
        prop_assert_eq!(forwarded, lines.len());
        prop_assert_eq!(sink.lines(), expected);
    }
}
