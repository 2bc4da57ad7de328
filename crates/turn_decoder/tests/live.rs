use serde_json::json;
use turn_decoder::{JobEvent, LiveDecoder, Role, SessionTracker, ToolCall, Turn};

fn decode(values: &[serde_json::Value]) -> Vec<Turn> {
    let mut decoder = LiveDecoder::new();
    let mut sessions = SessionTracker::new();
    let mut turns = Vec::new();

    for value in values {
        if let Some(event) = JobEvent::from_value(value) {
            if let Some(turn) = decoder.feed(event, &mut sessions) {
                turns.push(turn);
            }
        }
    }
    if let Some(turn) = decoder.finish() {
        turns.push(turn);
    }

    turns
}

fn text_delta(text: &str) -> serde_json::Value {
    json!({
        "type": "stream_event",
        "event": {"type": "content_block_delta", "delta": {"type": "text_delta", "text": text}},
    })
}

fn tool_start(name: &str, id: &str) -> serde_json::Value {
    json!({
        "type": "stream_event",
        "event": {
            "type": "content_block_start",
            "content_block": {"type": "tool_use", "name": name, "id": id},
        },
    })
}

fn arg_delta(partial: &str) -> serde_json::Value {
    json!({
        "type": "stream_event",
        "event": {
            "type": "content_block_delta",
            "delta": {"type": "input_json_delta", "partial_json": partial},
        },
    })
}

fn tool_result(id: &str, content: &str) -> serde_json::Value {
    json!({
        "type": "user",
        "message": {"content": [
            {"type": "tool_result", "tool_use_id": id, "content": content},
        ]},
    })
}

#[test]
fn single_reply_with_tool_call_closes_on_result_boundary() {
    let turns = decode(&[
        tool_start("A", "1"),
        arg_delta("{\"x\":1}"),
        tool_result("1", "ok"),
        json!({"type": "result", "cost_usd": 0.01}),
    ]);

    assert_eq!(turns.len(), 1);
    let turn = &turns[0];
    assert_eq!(turn.role, Role::Assistant);
    assert_eq!(
        turn.tool_calls,
        vec![ToolCall {
            name: "A".to_owned(),
            id: "1".to_owned(),
            arguments: "{\"x\":1}".to_owned(),
            result: "ok".to_owned(),
        }]
    );
    assert_eq!(turn.usage.as_deref(), Some("$0.0100"));
}

#[test]
fn every_fragment_is_accounted_for_exactly_once_in_arrival_order() {
    let turns = decode(&[
        json!({"type": "system", "subtype": "init", "session_id": "s"}),
        text_delta("Let me "),
        text_delta("look at "),
        tool_start("grep", "t1"),
        arg_delta("{\"pattern\":"),
        arg_delta("\"main\"}"),
        tool_result("t1", "3 matches"),
        text_delta("that file."),
        json!({"type": "result", "cost_usd": 0.02}),
        text_delta("Second "),
        text_delta("reply."),
        json!({"type": "done"}),
    ]);

    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].text, "Let me look at that file.");
    assert_eq!(turns[0].tool_calls.len(), 1);
    assert_eq!(turns[0].tool_calls[0].arguments, "{\"pattern\":\"main\"}");
    assert_eq!(turns[0].tool_calls[0].result, "3 matches");
    assert_eq!(turns[1].text, "Second reply.");
    assert!(turns[1].tool_calls.is_empty());
    assert_eq!(turns[1].usage, None);
}

#[test]
fn stream_ending_without_boundary_still_flushes_everything() {
    let turns = decode(&[
        text_delta("cut off mid-"),
        tool_start("bash", "t9"),
        arg_delta("{\"command\":\"ls\"}"),
    ]);

    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].text, "cut off mid-");
    assert_eq!(turns[0].tool_calls.len(), 1);
    assert_eq!(turns[0].tool_calls[0].name, "bash");
    assert_eq!(turns[0].tool_calls[0].arguments, "{\"command\":\"ls\"}");
    assert_eq!(turns[0].tool_calls[0].result, "");
}

#[test]
fn new_tool_start_preserves_the_previous_resultless_call() {
    let turns = decode(&[
        tool_start("first", "1"),
        arg_delta("{\"a\":1}"),
        tool_start("second", "2"),
        arg_delta("{\"b\":2}"),
        tool_result("2", "done"),
        json!({"type": "result"}),
    ]);

    assert_eq!(turns.len(), 1);
    let calls = &turns[0].tool_calls;
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].name, "first");
    assert_eq!(calls[0].arguments, "{\"a\":1}");
    assert_eq!(calls[0].result, "");
    assert_eq!(calls[1].name, "second");
    assert_eq!(calls[1].result, "done");
}

#[test]
fn orphan_result_synthesizes_a_nameless_tool_call() {
    let turns = decode(&[
        tool_result("nobody", "stray output"),
        json!({"type": "result"}),
    ]);

    assert_eq!(turns.len(), 1);
    assert_eq!(
        turns[0].tool_calls,
        vec![ToolCall::orphan_result("stray output")]
    );
}

#[test]
fn partial_text_is_observable_between_boundaries() {
    let mut decoder = LiveDecoder::new();
    let mut sessions = SessionTracker::new();

    for value in [text_delta("strea"), text_delta("ming")] {
        let event = JobEvent::from_value(&value).expect("delta should normalize");
        assert_eq!(decoder.feed(event, &mut sessions), None);
    }
    assert_eq!(decoder.partial_text(), "streaming");

    let boundary = JobEvent::from_value(&json!({"type": "result"})).expect("result event");
    let turn = decoder
        .feed(boundary, &mut sessions)
        .expect("boundary should close the turn");
    assert_eq!(turn.text, "streaming");
    assert_eq!(decoder.partial_text(), "");
}

#[test]
fn fully_formed_assistant_messages_concatenate_as_fallback() {
    let turns = decode(&[
        json!({
            "type": "assistant",
            "message": {"content": [
                {"type": "text", "text": "part one, "},
                {"type": "text", "text": "part two"},
            ]},
        }),
        json!({"type": "result", "session_id": "sess-x"}),
    ]);

    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].text, "part one, part two");
}

#[test]
fn diagnostics_interleave_without_disturbing_the_reply() {
    let turns = decode(&[
        text_delta("working on it"),
        json!({"type": "stderr", "text": "warning: slow disk"}),
        json!({"type": "result"}),
    ]);

    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::System);
    assert_eq!(turns[0].text, "⚠️ warning: slow disk");
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[1].text, "working on it");
}
