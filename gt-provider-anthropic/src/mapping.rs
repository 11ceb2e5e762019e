//! Conversion between the shared message/tool vocabulary and Anthropic's
//! Messages API wire format.

use gt_types::{CompletionResult, Message, MessageRole, StopReason, ToolCallRequest, ToolDefinition};
use serde_json::{Value, json};

pub(crate) fn to_api_request(
    messages: &[Message],
    tools: &[ToolDefinition],
    model: &str,
    system: &str,
    max_tokens: u64,
) -> Value {
    let mut body = json!({
        "model": model,
        "max_tokens": max_tokens,
        "messages": convert_messages(messages),
    });
    if !system.is_empty() {
        body["system"] = json!(system);
    }
    if !tools.is_empty() {
        body["tools"] = json!(convert_tools(tools));
    }
    body
}

fn convert_tools(tools: &[ToolDefinition]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "input_schema": t.parameters,
            })
        })
        .collect()
}

fn convert_messages(messages: &[Message]) -> Vec<Value> {
    let mut result = Vec::with_capacity(messages.len());
    for msg in messages {
        match msg.role {
            MessageRole::System => continue,
            MessageRole::User if !msg.tool_results.is_empty() => {
                let blocks: Vec<Value> = msg
                    .tool_results
                    .iter()
                    .map(|r| {
                        json!({
                            "type": "tool_result",
                            "tool_use_id": r.tool_call_id,
                            "content": r.output,
                            "is_error": r.is_error,
                        })
                    })
                    .collect();
                result.push(json!({"role": "user", "content": blocks}));
            }
            MessageRole::User => {
                result.push(json!({"role": "user", "content": msg.content}));
            }
            MessageRole::Assistant => {
                let mut blocks: Vec<Value> = Vec::new();
                if !msg.content.is_empty() {
                    blocks.push(json!({"type": "text", "text": msg.content}));
                }
                for tc in &msg.tool_calls {
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": tc.id,
                        "name": tc.name,
                        "input": tc.arguments,
                    }));
                }
                result.push(json!({"role": "assistant", "content": blocks}));
            }
        }
    }
    result
}

pub(crate) fn from_api_response(body: &Value) -> Result<CompletionResult, gt_types::ProviderError> {
    let content_blocks = body
        .get("content")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut content = String::new();
    let mut tool_calls = Vec::new();
    for block in &content_blocks {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(text) = block.get("text").and_then(Value::as_str) {
                    content.push_str(text);
                }
            }
            Some("tool_use") => {
                let id = block
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let name = block
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let arguments = block.get("input").cloned().unwrap_or(json!({}));
                tool_calls.push(ToolCallRequest {
                    id,
                    name,
                    arguments,
                });
            }
            _ => {}
        }
    }

    let stop_reason_raw = body.get("stop_reason").and_then(Value::as_str);
    let stop_reason = if !tool_calls.is_empty() {
        StopReason::ToolUse
    } else {
        match stop_reason_raw {
            Some("max_tokens") => StopReason::MaxTokens,
            Some("end_turn") | Some("stop_sequence") => StopReason::EndTurn,
            _ => StopReason::Other,
        }
    };

    let input_tokens = body
        .get("usage")
        .and_then(|u| u.get("input_tokens"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let output_tokens = body
        .get("usage")
        .and_then(|u| u.get("output_tokens"))
        .and_then(Value::as_u64)
        .unwrap_or(0);

    Ok(CompletionResult {
        content,
        tool_calls,
        stop_reason,
        input_tokens,
        output_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt_types::ToolResultEntry;

    #[test]
    fn tool_result_message_becomes_user_turn_with_blocks() {
        let msg = Message::tool_results(vec![ToolResultEntry {
            tool_call_id: "call_1".into(),
            tool_name: "read_file".into(),
            output: "42".into(),
            is_error: false,
        }]);
        let converted = convert_messages(&[msg]);
        assert_eq!(converted[0]["role"], "user");
        assert_eq!(converted[0]["content"][0]["type"], "tool_result");
        assert_eq!(converted[0]["content"][0]["tool_use_id"], "call_1");
    }

    #[test]
    fn response_with_tool_use_sets_stop_reason() {
        let body = json!({
            "content": [{"type": "tool_use", "id": "call_1", "name": "read_file", "input": {"path": "a"}}],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 5},
        });
        let result = from_api_response(&body).unwrap();
        assert_eq!(result.stop_reason, StopReason::ToolUse);
        assert_eq!(result.tool_calls.len(), 1);
    }

    #[test]
    fn response_with_only_text_is_end_turn() {
        let body = json!({
            "content": [{"type": "text", "text": "hello"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5},
        });
        let result = from_api_response(&body).unwrap();
        assert_eq!(result.stop_reason, StopReason::EndTurn);
        assert_eq!(result.content, "hello");
    }
}
