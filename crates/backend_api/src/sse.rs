use serde_json::Value;
use turn_decoder::JobEvent;

/// Incremental parser for the line-oriented job event stream.
///
/// The backend emits one JSON object per `data: ` line. Bytes may arrive
/// split at arbitrary boundaries, including inside a multibyte UTF-8
/// character, so the buffer holds raw bytes and decoding happens per
/// complete newline-terminated line. Lines without the prefix (keep-alives,
/// blank separators) and lines that fail to parse as JSON are skipped.
#[derive(Debug, Default)]
pub struct EventLineParser {
    buffer: Vec<u8>,
}

impl EventLineParser {
    /// Feed arbitrary bytes into the parser and drain complete events.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<JobEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(split) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(0..=split).collect();

            if let Some(event) = parse_line(&String::from_utf8_lossy(&line[..split])) {
                events.push(event);
            }
        }

        events
    }

    /// Drain a trailing line the stream closed without terminating.
    pub fn finish(&mut self) -> Option<JobEvent> {
        let line = std::mem::take(&mut self.buffer);
        parse_line(&String::from_utf8_lossy(&line))
    }

    /// Parse a complete stream payload in one shot.
    pub fn parse_lines(input: &str) -> Vec<JobEvent> {
        let mut parser = Self::default();
        let mut events = parser.feed(input.as_bytes());
        events.extend(parser.finish());
        events
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }
}

fn parse_line(line: &str) -> Option<JobEvent> {
    let payload = line.trim_end_matches('\r').strip_prefix("data: ")?;
    let value = serde_json::from_str::<Value>(payload).ok()?;
    JobEvent::from_value(&value)
}
