//! Byte-chunk framing for the search event stream.
//!
//! Chunks are buffered as bytes and split on `\n`. Since a newline byte never
//! occurs inside a multi-byte UTF-8 sequence, decoding only complete lines is
//! safe when a character straddles two chunks.

use super::error::FrameError;
use super::event::EventFrame;

/// Literal prefix of an event line.
pub const DATA_PREFIX: &str = "data: ";

/// Accumulates stream bytes and yields complete lines.
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed, without the
    /// trailing `\n`. The unterminated tail stays buffered.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let tail = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, tail);

        complete[..last_newline]
            .split(|b| *b == b'\n')
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect()
    }

    /// Bytes of the incomplete line still waiting for a newline.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}

/// Trimmed payload of a `data: ` line, or `None` for any other line and for
/// blank payloads.
pub fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix(DATA_PREFIX)
        .map(str::trim)
        .filter(|payload| !payload.is_empty())
}

/// Decode one line into an event frame. Non-data lines and blank payloads
/// yield `Ok(None)`.
pub fn decode_line(line: &str) -> Result<Option<EventFrame>, FrameError> {
    match data_payload(line) {
        Some(payload) => EventFrame::decode(payload).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::event::SearchEvent;

    #[test]
    fn splits_lines_and_keeps_tail() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"data: {\"a\":1}\n\ndata: {\"b\"");
        assert_eq!(lines, vec!["data: {\"a\":1}".to_string(), String::new()]);
        assert_eq!(framer.pending(), b"data: {\"b\"");

        let lines = framer.push(b":2}\n\n");
        assert_eq!(lines, vec!["data: {\"b\":2}".to_string(), String::new()]);
        assert!(framer.pending().is_empty());
    }

    #[test]
    fn chunk_without_newline_yields_nothing() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"data: partial").is_empty());
        assert!(framer.push(b" still partial").is_empty());
        assert_eq!(framer.push(b"\n"), vec!["data: partial still partial".to_string()]);
    }

    #[test]
    fn multibyte_character_across_chunks() {
        let line = "data: {\"title\":\"Les Misérables\"}\n";
        let bytes = line.as_bytes();
        let split = line.find('é').unwrap() + 1; // inside the two-byte sequence

        let mut framer = LineFramer::new();
        assert!(framer.push(&bytes[..split]).is_empty());
        let lines = framer.push(&bytes[split..]);
        assert_eq!(lines, vec!["data: {\"title\":\"Les Misérables\"}".to_string()]);
    }

    #[test]
    fn data_payload_rules() {
        assert_eq!(data_payload("data: {\"x\":1}  "), Some("{\"x\":1}"));
        assert_eq!(data_payload("data: {\"x\":1}\r"), Some("{\"x\":1}"));
        assert_eq!(data_payload("data:    "), None);
        assert_eq!(data_payload("data:{\"x\":1}"), None);
        assert_eq!(data_payload("event: update"), None);
        assert_eq!(data_payload(": keep-alive"), None);
        assert_eq!(data_payload(""), None);
    }

    #[test]
    fn decode_line_outcomes() {
        assert_eq!(decode_line("id: 7").unwrap(), None);
        assert_eq!(decode_line("data: ").unwrap(), None);

        let frame = decode_line(r#"data: {"event":"provider.progress","provider_id":"p1","discovered":9}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            frame.event,
            SearchEvent::ProviderProgress {
                provider_id: "p1".into(),
                discovered: 9,
            }
        );

        assert!(decode_line("data: not-json").is_err());
    }
}
