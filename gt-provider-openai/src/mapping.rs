//! Conversion between the shared message/tool vocabulary and OpenAI's
//! chat completions wire format.

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
        "messages": convert_messages(messages, system),
        "max_completion_tokens": max_tokens,
    });
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
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                },
            })
        })
        .collect()
}

fn convert_messages(messages: &[Message], system: &str) -> Vec<Value> {
    let mut result = Vec::with_capacity(messages.len() + 1);
    if !system.is_empty() {
        result.push(json!({"role": "system", "content": system}));
    }
    for msg in messages {
        match msg.role {
            MessageRole::System => continue,
            MessageRole::User if !msg.tool_results.is_empty() => {
                for r in &msg.tool_results {
                    result.push(json!({
                        "role": "tool",
                        "tool_call_id": r.tool_call_id,
                        "content": r.output,
                    }));
                }
            }
            MessageRole::User => {
                result.push(json!({"role": "user", "content": msg.content}));
            }
            MessageRole::Assistant => {
                let mut entry = json!({"role": "assistant"});
                if !msg.content.is_empty() {
                    entry["content"] = json!(msg.content);
                }
                if !msg.tool_calls.is_empty() {
                    entry["tool_calls"] = json!(
                        msg.tool_calls
                            .iter()
                            .map(|tc| json!({
                                "id": tc.id,
                                "type": "function",
                                "function": {
                                    "name": tc.name,
                                    "arguments": tc.arguments.to_string(),
                                },
                            }))
                            .collect::<Vec<_>>()
                    );
                }
                result.push(entry);
            }
        }
    }
    result
}

pub(crate) fn from_api_response(body: &Value) -> Result<CompletionResult, gt_types::ProviderError> {
    let choice = body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .ok_or_else(|| gt_types::ProviderError::Decode("response has no choices".into()))?;

    let message = choice.get("message").cloned().unwrap_or(json!({}));
    let content = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let mut tool_calls = Vec::new();
    if let Some(raw_calls) = message.get("tool_calls").and_then(Value::as_array) {
        for tc in raw_calls {
            let id = tc.get("id").and_then(Value::as_str).unwrap_or_default();
            let function = tc.get("function").cloned().unwrap_or(json!({}));
            let name = function
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let arguments_raw = function
                .get("arguments")
                .and_then(Value::as_str)
                .unwrap_or("{}");
            let arguments = serde_json::from_str(arguments_raw).unwrap_or(json!({}));
            tool_calls.push(ToolCallRequest {
                id: id.to_string(),
                name: name.to_string(),
                arguments,
            });
        }
    }

    let finish_reason = choice.get("finish_reason").and_then(Value::as_str);
    let stop_reason = if !tool_calls.is_empty() {
        StopReason::ToolUse
    } else {
        match finish_reason {
            Some("length") => StopReason::MaxTokens,
            Some("stop") => StopReason::EndTurn,
            _ => StopReason::Other,
        }
    };

    let usage = body.get("usage");
    let input_tokens = usage
        .and_then(|u| u.get("prompt_tokens"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let output_tokens = usage
        .and_then(|u| u.get("completion_tokens"))
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

    #[test]
    fn response_with_tool_call_parses_json_arguments() {
        let body = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "function": {"name": "read_file", "arguments": "{\"path\":\"a\"}"},
                    }],
                },
                "finish_reason": "tool_calls",
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5},
        });
        let result = from_api_response(&body).unwrap();
        assert_eq!(result.stop_reason, StopReason::ToolUse);
        assert_eq!(result.tool_calls[0].arguments["path"], "a");
    }

    #[test]
    fn length_finish_reason_maps_to_max_tokens() {
        let body = json!({
            "choices": [{"message": {"content": "partial"}, "finish_reason": "length"}],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1},
        });
        let result = from_api_response(&body).unwrap();
        assert_eq!(result.stop_reason, StopReason::MaxTokens);
    }
}
