//! Conversion between the shared message/tool vocabulary and Gemini's
//! `generateContent` wire format.

use gt_types::{CompletionResult, Message, MessageRole, StopReason, ToolCallRequest, ToolDefinition};
use serde_json::{Value, json};

pub(crate) fn to_api_request(
    messages: &[Message],
    tools: &[ToolDefinition],
    system: &str,
    max_tokens: u64,
) -> Value {
    let mut body = json!({
        "contents": convert_messages(messages),
        "generationConfig": {"maxOutputTokens": max_tokens},
    });
    if !system.is_empty() {
        body["systemInstruction"] = json!({"parts": [{"text": system}]});
    }
    if !tools.is_empty() {
        body["tools"] = json!([{"functionDeclarations": convert_tools(tools)}]);
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
                "parameters": jsonschema_to_gemini(&t.parameters),
            })
        })
        .collect()
}

/// Best-effort conversion of a JSON Schema object to Gemini's schema
/// dialect: types are upper-cased and object shape is otherwise preserved.
fn jsonschema_to_gemini(schema: &Value) -> Value {
    let mut result = serde_json::Map::new();
    if let Some(t) = schema.get("type").and_then(Value::as_str) {
        result.insert("type".into(), json!(t.to_uppercase()));
    }
    if let Some(props) = schema.get("properties").and_then(Value::as_object) {
        let converted: serde_json::Map<String, Value> = props
            .iter()
            .map(|(k, v)| (k.clone(), jsonschema_to_gemini(v)))
            .collect();
        result.insert("properties".into(), Value::Object(converted));
    }
    if let Some(required) = schema.get("required") {
        result.insert("required".into(), required.clone());
    }
    if let Some(description) = schema.get("description") {
        result.insert("description".into(), description.clone());
    }
    if let Some(items) = schema.get("items") {
        result.insert("items".into(), jsonschema_to_gemini(items));
    }
    if let Some(e) = schema.get("enum") {
        result.insert("enum".into(), e.clone());
    }
    Value::Object(result)
}

fn convert_messages(messages: &[Message]) -> Vec<Value> {
    let mut result = Vec::with_capacity(messages.len());
    for msg in messages {
        match msg.role {
            MessageRole::System => continue,
            MessageRole::User if !msg.tool_results.is_empty() => {
                let parts: Vec<Value> = msg
                    .tool_results
                    .iter()
                    .map(|r| {
                        json!({
                            "functionResponse": {
                                "name": r.tool_name,
                                "response": {"result": r.output},
                            },
                        })
                    })
                    .collect();
                result.push(json!({"role": "user", "parts": parts}));
            }
            MessageRole::User => {
                result.push(json!({"role": "user", "parts": [{"text": msg.content}]}));
            }
            MessageRole::Assistant => {
                let mut parts: Vec<Value> = Vec::new();
                if !msg.content.is_empty() {
                    parts.push(json!({"text": msg.content}));
                }
                for tc in &msg.tool_calls {
                    parts.push(json!({
                        "functionCall": {"name": tc.name, "args": tc.arguments},
                    }));
                }
                result.push(json!({"role": "model", "parts": parts}));
            }
        }
    }
    result
}

pub(crate) fn from_api_response(body: &Value) -> Result<CompletionResult, gt_types::ProviderError> {
    let candidate = body
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first());

    let mut content = String::new();
    let mut tool_calls = Vec::new();
    if let Some(candidate) = candidate {
        if let Some(parts) = candidate
            .get("content")
            .and_then(|c| c.get("parts"))
            .and_then(Value::as_array)
        {
            for part in parts {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    content.push_str(text);
                } else if let Some(fc) = part.get("functionCall") {
                    let name = fc.get("name").and_then(Value::as_str).unwrap_or_default();
                    let arguments = fc.get("args").cloned().unwrap_or(json!({}));
                    let id = format!("call_{}", uuid::Uuid::new_v4().simple());
                    tool_calls.push(ToolCallRequest {
                        id: id.chars().take(17).collect(),
                        name: name.to_string(),
                        arguments,
                    });
                }
            }
        }
    }

    let finish_reason = candidate
        .and_then(|c| c.get("finishReason"))
        .and_then(Value::as_str);
    let stop_reason = if !tool_calls.is_empty() {
        StopReason::ToolUse
    } else {
        match finish_reason {
            Some("MAX_TOKENS") => StopReason::MaxTokens,
            Some("STOP") => StopReason::EndTurn,
            _ => StopReason::Other,
        }
    };

    let usage = body.get("usageMetadata");
    let input_tokens = usage
        .and_then(|u| u.get("promptTokenCount"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let output_tokens = usage
        .and_then(|u| u.get("candidatesTokenCount"))
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
    fn schema_types_are_uppercased() {
        let schema = json!({"type": "object", "properties": {"path": {"type": "string"}}});
        let converted = jsonschema_to_gemini(&schema);
        assert_eq!(converted["type"], "OBJECT");
        assert_eq!(converted["properties"]["path"]["type"], "STRING");
    }

    #[test]
    fn function_call_part_becomes_tool_call() {
        let body = json!({
            "candidates": [{
                "content": {"parts": [{"functionCall": {"name": "read_file", "args": {"path": "a"}}}]},
                "finishReason": "STOP",
            }],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5},
        });
        let result = from_api_response(&body).unwrap();
        assert_eq!(result.stop_reason, StopReason::ToolUse);
        assert_eq!(result.tool_calls[0].name, "read_file");
    }

    #[test]
    fn function_response_part_uses_tool_name_not_call_id() {
        let msg = Message::tool_results(vec![gt_types::ToolResultEntry {
            tool_call_id: "call_9f3a".into(),
            tool_name: "read_file".into(),
            output: "contents".into(),
            is_error: false,
        }]);
        let converted = convert_messages(&[msg]);
        assert_eq!(converted[0]["parts"][0]["functionResponse"]["name"], "read_file");
    }

    #[test]
    fn max_tokens_finish_reason_maps_correctly() {
        let body = json!({
            "candidates": [{"content": {"parts": [{"text": "partial"}]}, "finishReason": "MAX_TOKENS"}],
            "usageMetadata": {"promptTokenCount": 1, "candidatesTokenCount": 1},
        });
        let result = from_api_response(&body).unwrap();
        assert_eq!(result.stop_reason, StopReason::MaxTokens);
    }
}
