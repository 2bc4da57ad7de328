use crate::event::JobEvent;
use crate::session::SessionTracker;
use crate::turn::{PendingToolCall, ToolCall, Turn};

/// Warning marker prefixed to side-channel diagnostic turns.
pub const DIAGNOSTIC_PREFIX: &str = "⚠️ ";

/// Folding state machine that rebuilds turns from normalized stream events.
///
/// One accumulator exists per job stream. Each [`apply`](Self::apply) step
/// consumes one event and yields at most one completed [`Turn`]; the text and
/// tool buffers carry everything accumulated since the previous turn boundary.
/// The single pending-tool slot is an explicit `Option`: a new tool-use start
/// always flushes the previous pending call, result or not, so partial calls
/// are preserved rather than dropped.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    text: String,
    tools: Vec<ToolCall>,
    pending: Option<PendingToolCall>,
}

impl Accumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one event into the state, yielding a turn when the event closes
    /// a natural boundary.
    pub fn apply(&mut self, event: JobEvent, sessions: &mut SessionTracker) -> Option<Turn> {
        match event {
            JobEvent::SystemInit { session_id } => {
                if let Some(session_id) = session_id {
                    sessions.observe(&session_id);
                }
                None
            }
            JobEvent::AssistantMessage { text_blocks } => {
                for block in text_blocks {
                    self.text.push_str(&block);
                }
                None
            }
            JobEvent::ToolUseStart { name, id } => {
                self.flush_pending();
                self.pending = Some(PendingToolCall::new(name, id));
                None
            }
            JobEvent::TextDelta { text } => {
                self.text.push_str(&text);
                None
            }
            JobEvent::ArgumentDelta { partial } => {
                // No pending slot means the start event was lost; the fragment
                // has nothing to attach to and is dropped.
                if let Some(pending) = self.pending.as_mut() {
                    pending.arguments.push_str(&partial);
                }
                None
            }
            JobEvent::ToolResults { results } => {
                for result in results {
                    match self.pending.take() {
                        Some(mut pending) => {
                            pending.result = Some(result);
                            self.tools.push(pending.finish());
                        }
                        None => self.tools.push(ToolCall::orphan_result(result)),
                    }
                }
                None
            }
            JobEvent::Result {
                session_id,
                cost_usd,
                input_tokens,
                output_tokens,
            } => {
                if let Some(session_id) = session_id {
                    sessions.observe(&session_id);
                }
                let usage = usage_summary(cost_usd, input_tokens, output_tokens);
                self.flush_pending();
                self.take_turn(usage)
            }
            JobEvent::Error { text } | JobEvent::Stderr { text } => {
                if text.is_empty() {
                    return None;
                }
                Some(Turn::system(format!("{DIAGNOSTIC_PREFIX}{text}")))
            }
            JobEvent::Done => self.finish(),
        }
    }

    /// Flushes remaining buffers at end of sequence, covering streams that end
    /// without a `result` or `done` boundary (for example after cancellation).
    pub fn finish(&mut self) -> Option<Turn> {
        self.flush_pending();
        self.take_turn(None)
    }

    /// Text accumulated since the last turn boundary, for partial repaint.
    #[must_use]
    pub fn partial_text(&self) -> &str {
        &self.text
    }

    fn flush_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.tools.push(pending.finish());
        }
    }

    fn take_turn(&mut self, usage: Option<String>) -> Option<Turn> {
        if self.text.trim().is_empty() && self.tools.is_empty() {
            self.text.clear();
            return None;
        }
        Some(Turn::assistant(
            std::mem::take(&mut self.text),
            std::mem::take(&mut self.tools),
            usage,
        ))
    }
}

/// Formats the cost/usage summary, omitting absent components.
///
/// Zero token counts count as absent, matching the backend's own rendering.
#[must_use]
pub fn usage_summary(
    cost_usd: Option<f64>,
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(cost) = cost_usd {
        parts.push(format!("${cost:.4}"));
    }
    if let Some(tokens) = input_tokens.filter(|tokens| *tokens > 0) {
        parts.push(format!("in:{tokens}"));
    }
    if let Some(tokens) = output_tokens.filter(|tokens| *tokens > 0) {
        parts.push(format!("out:{tokens}"));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    }
}
