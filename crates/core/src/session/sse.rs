//! # Frame Parser
//!
//! Turns the raw chunked response body into parsed stream events. The
//! transport guarantees nothing about chunk alignment, so a single
//! carry-over buffer holds whatever trails the last newline until the next
//! chunk arrives. A frame that fails to decode is logged and dropped; the
//! stream itself keeps going.

use super::event::StreamEvent;

/// Prefix marking an event-bearing line.
pub const DATA_PREFIX: &str = "data: ";

/// Incremental splitter from byte chunks to complete `data:` frames.
#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: Vec<u8>,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and collect every event it completed, in arrival
    /// order. A line straddling chunk boundaries is held back until its
    /// newline shows up.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = parse_line(line.trim_end_matches(['\n', '\r'])) {
                events.push(event);
            }
        }
        events
    }

    /// Signal end of transport. A dangling partial line is incomplete by
    /// construction and cannot be a valid frame, so it is discarded.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() {
            tracing::debug!(
                bytes = self.buffer.len(),
                "discarding partial line at end of stream"
            );
            self.buffer.clear();
        }
    }
}

fn parse_line(line: &str) -> Option<StreamEvent> {
    let data = line.strip_prefix(DATA_PREFIX)?;
    match serde_json::from_str(data) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(error = %e, frame = data, "dropping malformed stream frame");
            None
        }
    }
}
