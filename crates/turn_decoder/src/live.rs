use crate::accumulator::Accumulator;
use crate::event::JobEvent;
use crate::session::SessionTracker;
use crate::turn::Turn;

/// Incremental decoder for one live job stream.
///
/// Feeds events to the shared [`Accumulator`] fold one at a time and yields
/// each completed [`Turn`] immediately, unlike the replay path which buffers
/// its whole output. Between boundaries, [`partial_text`](Self::partial_text)
/// exposes the in-progress reply so a caller can repaint streaming output.
///
/// The decoder does not own an end-of-stream signal: the event source closes
/// the sequence (channel disconnect for the live transport), after which the
/// caller invokes [`finish`](Self::finish) exactly once to flush whatever the
/// stream left behind. Transport failures reach the decoder as synthetic
/// [`JobEvent::Error`] events and surface as ordinary diagnostic turns.
#[derive(Debug, Default)]
pub struct LiveDecoder {
    accumulator: Accumulator,
}

impl LiveDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one event, yielding a completed turn at boundaries.
    pub fn feed(&mut self, event: JobEvent, sessions: &mut SessionTracker) -> Option<Turn> {
        self.accumulator.apply(event, sessions)
    }

    /// Text accumulated since the last boundary, for partial display.
    #[must_use]
    pub fn partial_text(&self) -> &str {
        self.accumulator.partial_text()
    }

    /// Flushes remaining buffers once the event sequence has ended.
    ///
    /// Covers streams that end without a trailing `result` or `done` event so
    /// no accumulated content is discarded on an unclean end.
    pub fn finish(&mut self) -> Option<Turn> {
        self.accumulator.finish()
    }
}
