//! Incremental decoding of the execution event stream.
//!
//! Records arrive as `data: {json}` lines. Anything else on the wire
//! (comments, `event:` lines, blank separators, unparseable payloads) is
//! dropped.

use std::collections::VecDeque;

use agentflow_core::ExecutionEvent;
use bytes::Bytes;
use futures::stream;
use futures::Stream;
use futures::StreamExt;
use tracing::debug;

/// Line splitter over raw bytes. Bytes are buffered until a newline arrives,
/// so multi-byte characters split across chunks decode intact.
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    buffer: Vec<u8>,
}

impl EventStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<ExecutionEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(end) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            if let Some(event) = decode_line(&line[..end]) {
                events.push(event);
            }
        }
        events
    }

    /// Decodes an unterminated trailing line left when the transport closed.
    pub fn finish(&mut self) -> Option<ExecutionEvent> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }
}

pub fn decode_line(line: &[u8]) -> Option<ExecutionEvent> {
    let Ok(line) = std::str::from_utf8(line) else {
        debug!(target: "agentflow.stream", len = line.len(), "non-utf8 line dropped");
        return None;
    };
    let payload = line.trim_end_matches('\r').strip_prefix("data:")?.trim();
    if payload.is_empty() {
        return None;
    }
    match serde_json::from_str(payload) {
        Ok(event) => Some(event),
        Err(err) => {
            debug!(target: "agentflow.stream", error = %err, "malformed record dropped");
            None
        }
    }
}

struct DecodeState<S> {
    inner: S,
    decoder: EventStreamDecoder,
    ready: VecDeque<ExecutionEvent>,
    finished: bool,
}

/// Turns a byte stream into the events it carries, in arrival order.
///
/// A transport error is yielded once and ends the stream; the partial line
/// buffered at that point is discarded.
pub fn decode_stream<S, E>(inner: S) -> impl Stream<Item = Result<ExecutionEvent, E>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    let state = DecodeState {
        inner,
        decoder: EventStreamDecoder::new(),
        ready: VecDeque::new(),
        finished: false,
    };
    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.ready.pop_front() {
                return Some((Ok(event), state));
            }
            if state.finished {
                return None;
            }
            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(&chunk);
                    state.ready.extend(events);
                }
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((Err(err), state));
                }
                None => {
                    state.finished = true;
                    let trailing = state.decoder.finish();
                    state.ready.extend(trailing);
                }
            }
        }
    })
}
