use serde_json::Value;

use crate::event::resolve_result_content;
use crate::session::SessionTracker;
use crate::turn::{Role, ToolCall, Turn};

/// Decodes a fully materialized stored-history log into ordered turns.
///
/// The stored encoding differs structurally from the live stream: records are
/// fully formed (one `assistant` record is one turn, never a delta), a `user`
/// record's content is either a plain string (an actual user message) or a
/// list of tool results, and a tool's result may appear arbitrarily many
/// records after its invocation. Correlation is therefore by `tool_use_id`
/// through an insertion-ordered map rather than by a pending slot.
///
/// Correlation is order-independent: a result seen before its invocation is
/// claimed when the invocation is decoded, and a result seen after it is
/// back-filled onto the already-emitted call at end of pass. Results with no
/// invocation anywhere in the window attach to the last turn as nameless
/// tool calls when that turn is an assistant turn.
#[must_use]
pub fn decode_history(records: &[Value], sessions: &mut SessionTracker) -> Vec<Turn> {
    let mut turns = Vec::new();
    let mut unclaimed = ResultMap::default();

    for record in records {
        if let Some(session_id) = record.get("sessionId").and_then(Value::as_str) {
            sessions.observe(session_id);
        }

        match record.get("type").and_then(Value::as_str) {
            Some("user") => decode_user_record(record, &mut turns, &mut unclaimed),
            Some("assistant") => decode_assistant_record(record, &mut turns, &mut unclaimed),
            _ => {}
        }
    }

    attach_unclaimed_results(&mut turns, unclaimed);
    turns
}

/// Pending tool results keyed by `tool_use_id`, preserving stored order so a
/// re-parse of the same log reproduces the identical turn sequence.
#[derive(Debug, Default)]
struct ResultMap {
    entries: Vec<(String, String)>,
}

impl ResultMap {
    fn insert(&mut self, id: String, result: String) {
        self.entries.push((id, result));
    }

    /// Removes and returns the earliest stored result for `id`.
    fn claim(&mut self, id: &str) -> Option<String> {
        let index = self.entries.iter().position(|(entry_id, _)| entry_id == id)?;
        Some(self.entries.remove(index).1)
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn decode_user_record(record: &Value, turns: &mut Vec<Turn>, unclaimed: &mut ResultMap) {
    match record.get("message").and_then(|message| message.get("content")) {
        // Plain string content is an actual user message, emitted verbatim.
        Some(Value::String(text)) => {
            if !text.trim().is_empty() {
                turns.push(Turn::user(text.clone()));
            }
        }
        Some(Value::Array(blocks)) => {
            for block in blocks {
                if block.get("type").and_then(Value::as_str) != Some("tool_result") {
                    continue;
                }
                let id = block
                    .get("tool_use_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                unclaimed.insert(id.to_owned(), resolve_result_content(block.get("content")));
            }
        }
        _ => {}
    }
}

fn decode_assistant_record(record: &Value, turns: &mut Vec<Turn>, unclaimed: &mut ResultMap) {
    let blocks = record
        .get("message")
        .and_then(|message| message.get("content"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for block in blocks {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(fragment) = block.get("text").and_then(Value::as_str) {
                    text.push_str(fragment);
                }
            }
            Some("tool_use") => {
                let id = block
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned();
                tool_calls.push(ToolCall {
                    name: block
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or("tool")
                        .to_owned(),
                    result: unclaimed.claim(&id).unwrap_or_default(),
                    arguments: block
                        .get("input")
                        .map(|input| serde_json::to_string(input).unwrap_or_default())
                        .unwrap_or_default(),
                    id,
                });
            }
            _ => {}
        }
    }

    if !text.trim().is_empty() || !tool_calls.is_empty() {
        turns.push(Turn::assistant(text, tool_calls, None));
    }
}

/// Settles results still in the map after the full pass.
///
/// A result arriving after its invocation is back-filled onto the emitted
/// call with the matching id. Results with no invocation anywhere land on
/// the last turn as nameless calls when that turn is an assistant turn, and
/// are dropped otherwise.
fn attach_unclaimed_results(turns: &mut [Turn], unclaimed: ResultMap) {
    if unclaimed.is_empty() {
        return;
    }

    let mut leftovers = Vec::new();
    for (id, result) in unclaimed.entries {
        if id.is_empty() {
            leftovers.push(result);
            continue;
        }
        let invocation = turns
            .iter_mut()
            .flat_map(|turn| turn.tool_calls.iter_mut())
            .find(|call| call.id == id && call.result.is_empty());
        match invocation {
            Some(call) => call.result = result,
            None => leftovers.push(result),
        }
    }

    let Some(last) = turns.last_mut() else {
        return;
    };
    if last.role != Role::Assistant {
        return;
    }
    for result in leftovers {
        last.tool_calls.push(ToolCall::orphan_result(result));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn plain_string_user_content_is_a_verbatim_user_turn() {
        let records = vec![json!({
            "type": "user",
            "sessionId": "s1",
            "message": {"content": "please fix the  tests "},
        })];
        let mut sessions = SessionTracker::new();

        let turns = decode_history(&records, &mut sessions);
        assert_eq!(turns, vec![Turn::user("please fix the  tests ")]);
        assert_eq!(sessions.last(), Some("s1"));
    }

    #[test]
    fn session_ids_fold_from_every_record_kind() {
        let records = vec![
            json!({"type": "summary", "sessionId": "s1"}),
            json!({"type": "user", "sessionId": "s2", "message": {"content": "hi"}}),
        ];
        let mut sessions = SessionTracker::new();

        decode_history(&records, &mut sessions);
        assert_eq!(sessions.seen(), ["s1".to_owned(), "s2".to_owned()]);
    }

    #[test]
    fn tool_use_arguments_serialize_the_input_object() {
        let records = vec![json!({
            "type": "assistant",
            "message": {"content": [
                {"type": "tool_use", "name": "read_file", "id": "t1", "input": {"path": "a.rs"}},
            ]},
        })];
        let mut sessions = SessionTracker::new();

        let turns = decode_history(&records, &mut sessions);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].tool_calls[0].arguments, "{\"path\":\"a.rs\"}");
        assert_eq!(turns[0].tool_calls[0].result, "");
    }

    #[test]
    fn empty_assistant_record_emits_no_turn() {
        let records = vec![json!({
            "type": "assistant",
            "message": {"content": [{"type": "thinking", "thinking": "..."}]},
        })];
        let mut sessions = SessionTracker::new();

        assert!(decode_history(&records, &mut sessions).is_empty());
    }

    #[test]
    fn unclaimed_results_attach_to_a_trailing_assistant_turn() {
        let records = vec![
            json!({
                "type": "assistant",
                "message": {"content": [{"type": "text", "text": "done"}]},
            }),
            json!({
                "type": "user",
                "message": {"content": [
                    {"type": "tool_result", "tool_use_id": "ghost", "content": "late result"},
                ]},
            }),
        ];
        let mut sessions = SessionTracker::new();

        let turns = decode_history(&records, &mut sessions);
        assert_eq!(turns.len(), 1);
        assert_eq!(
            turns[0].tool_calls,
            vec![ToolCall::orphan_result("late result")]
        );
    }

    #[test]
    fn unclaimed_results_are_dropped_when_last_turn_is_not_assistant() {
        let records = vec![
            json!({
                "type": "user",
                "message": {"content": [
                    {"type": "tool_result", "tool_use_id": "ghost", "content": "late result"},
                ]},
            }),
            json!({"type": "user", "message": {"content": "a user message"}}),
        ];
        let mut sessions = SessionTracker::new();

        let turns = decode_history(&records, &mut sessions);
        assert_eq!(turns, vec![Turn::user("a user message")]);
    }
}
