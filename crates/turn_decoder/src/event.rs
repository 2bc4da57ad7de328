use serde_json::Value;

/// Normalized live-stream event extracted from one raw backend record.
///
/// The live wire encoding is a loosely-typed JSON object per record with a
/// `type` discriminant; this enum captures only the fields the accumulator
/// acts on. Extraction is best-effort: records of unknown kind, unknown inner
/// delta shapes, and text-block-start markers normalize to `None` and are
/// dropped before they reach the fold.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// `system`/`init` handshake carrying the session identifier.
    SystemInit { session_id: Option<String> },
    /// Fully formed assistant message; fallback path when deltas are absent.
    AssistantMessage { text_blocks: Vec<String> },
    /// `user` record carrying one or more tool results, resolved to plain text.
    ToolResults { results: Vec<String> },
    /// Inner `content_block_start` for a tool-use block.
    ToolUseStart { name: String, id: String },
    /// Inner `text_delta` fragment.
    TextDelta { text: String },
    /// Inner `input_json_delta` fragment for the pending tool call.
    ArgumentDelta { partial: String },
    /// Turn boundary carrying session id and cost/usage data.
    Result {
        session_id: Option<String>,
        cost_usd: Option<f64>,
        input_tokens: Option<u64>,
        output_tokens: Option<u64>,
    },
    /// Side-channel diagnostic from the backend or the transport.
    Error { text: String },
    /// Side-channel diagnostic mirroring the remote process stderr.
    Stderr { text: String },
    /// Terminal signal; the remote side ended the stream without a `result`.
    Done,
}

impl JobEvent {
    /// Maps one raw live-encoding record to a normalized event.
    ///
    /// Returns `None` for records the decoders ignore (unknown kinds,
    /// keep-alive noise, non-init system records, text block starts).
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let kind = value.get("type").and_then(Value::as_str)?;

        match kind {
            "system" => {
                if value.get("subtype").and_then(Value::as_str) != Some("init") {
                    return None;
                }
                Some(Self::SystemInit {
                    session_id: string_field(value, "session_id"),
                })
            }
            "assistant" => Some(Self::AssistantMessage {
                text_blocks: message_blocks(value)
                    .iter()
                    .filter(|block| block_type(block) == Some("text"))
                    .filter_map(|block| string_field(block, "text"))
                    .collect(),
            }),
            "user" => {
                let results: Vec<String> = message_blocks(value)
                    .iter()
                    .filter(|block| block_type(block) == Some("tool_result"))
                    .map(|block| resolve_result_content(block.get("content")))
                    .collect();
                if results.is_empty() {
                    return None;
                }
                Some(Self::ToolResults { results })
            }
            "stream_event" => map_inner_event(value.get("event")?),
            "result" => Some(Self::Result {
                session_id: string_field(value, "session_id"),
                cost_usd: value.get("cost_usd").and_then(Value::as_f64),
                input_tokens: usage_tokens(value, "input_tokens"),
                output_tokens: usage_tokens(value, "output_tokens"),
            }),
            "error" => Some(Self::Error {
                text: string_field(value, "text").unwrap_or_default(),
            }),
            "stderr" => Some(Self::Stderr {
                text: string_field(value, "text").unwrap_or_default(),
            }),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

fn map_inner_event(inner: &Value) -> Option<JobEvent> {
    match inner.get("type").and_then(Value::as_str)? {
        "content_block_start" => {
            let block = inner.get("content_block")?;
            if block_type(block) != Some("tool_use") {
                return None;
            }
            Some(JobEvent::ToolUseStart {
                name: string_field(block, "name").unwrap_or_else(|| "tool".to_owned()),
                id: string_field(block, "id").unwrap_or_default(),
            })
        }
        "content_block_delta" => {
            let delta = inner.get("delta")?;
            match block_type(delta)? {
                "text_delta" => Some(JobEvent::TextDelta {
                    text: string_field(delta, "text").unwrap_or_default(),
                }),
                "input_json_delta" => Some(JobEvent::ArgumentDelta {
                    partial: string_field(delta, "partial_json").unwrap_or_default(),
                }),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Resolves a tool-result content payload to plain text.
///
/// The payload is either a plain string or a list of sub-blocks whose `text`
/// fields are joined with newlines; anything else resolves to empty.
#[must_use]
pub fn resolve_result_content(content: Option<&Value>) -> String {
    match content {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| item.is_object())
            .map(|item| string_field(item, "text").unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

fn message_blocks(value: &Value) -> &[Value] {
    value
        .get("message")
        .and_then(|message| message.get("content"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn block_type(block: &Value) -> Option<&str> {
    block.get("type").and_then(Value::as_str)
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_owned)
}

fn usage_tokens(value: &Value, field: &str) -> Option<u64> {
    value
        .get("usage")
        .and_then(|usage| usage.get(field))
        .and_then(Value::as_u64)
}
