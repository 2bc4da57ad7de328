/// Accumulated session identifiers observed while decoding one connection.
///
/// Mutated only by the decoders on the consumer side; the caller reads a
/// snapshot of it to populate session pickers. Created at connect time and
/// cleared on disconnect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTracker {
    last: Option<String>,
    seen: Vec<String>,
}

impl SessionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one observed session identifier. Empty identifiers are ignored;
    /// repeats update the most-recent marker without duplicating the set.
    pub fn observe(&mut self, session_id: &str) {
        if session_id.is_empty() {
            return;
        }
        if !self.seen.iter().any(|seen| seen == session_id) {
            self.seen.push(session_id.to_owned());
        }
        self.last = Some(session_id.to_owned());
    }

    /// Most recently observed session identifier.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }

    /// All session identifiers seen so far, in first-observation order.
    #[must_use]
    pub fn seen(&self) -> &[String] {
        &self.seen
    }

    /// Forgets all observed identifiers, for disconnect.
    pub fn clear(&mut self) {
        self.last = None;
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::SessionTracker;

    #[test]
    fn observe_deduplicates_but_tracks_most_recent() {
        let mut tracker = SessionTracker::new();
        tracker.observe("a");
        tracker.observe("b");
        tracker.observe("a");

        assert_eq!(tracker.seen(), ["a".to_owned(), "b".to_owned()]);
        assert_eq!(tracker.last(), Some("a"));
    }

    #[test]
    fn empty_identifiers_are_ignored() {
        let mut tracker = SessionTracker::new();
        tracker.observe("");
        assert_eq!(tracker.last(), None);
        assert!(tracker.seen().is_empty());
    }

    #[test]
    fn clear_resets_for_disconnect() {
        let mut tracker = SessionTracker::new();
        tracker.observe("a");
        tracker.clear();
        assert_eq!(tracker, SessionTracker::new());
    }
}
