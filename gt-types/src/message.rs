//! Message history and completion result types shared across providers.

use serde::{Deserialize, Serialize};

/// Who authored a message in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// The system prompt, always first in history.
    System,
    /// The user turn (the task prompt, or a batch of tool results).
    User,
    /// A model-generated turn, possibly carrying tool calls.
    Assistant,
}

/// A single tool invocation the model asked for in an assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Provider-assigned id, echoed back in the matching tool result.
    pub id: String,
    /// Name of the tool to invoke; must match a registered tool.
    pub name: String,
    /// Arguments, as decoded JSON.
    pub arguments: serde_json::Value,
}

/// The result of running one tool call, folded back into the next user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResultEntry {
    /// Id of the `ToolCallRequest` this result answers.
    pub tool_call_id: String,
    /// Name of the tool that was invoked, carried alongside the call id
    /// for wire formats (Gemini) that correlate results by name rather
    /// than by id.
    pub tool_name: String,
    /// Tool output, already truncated to the sandbox's output cap.
    pub output: String,
    /// Whether the tool reported an error rather than a normal result.
    pub is_error: bool,
}

/// One entry in the conversation history sent to a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author of this turn.
    pub role: MessageRole,
    /// Free-text content. Empty for assistant turns that are pure tool calls.
    pub content: String,
    /// Tool calls requested by this turn, if any (assistant turns only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    /// Tool results being reported back, if any (user turns only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResultEntry>,
}

impl Message {
    /// Build a plain system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    /// Build a plain user turn with free-text content.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    /// Build a user turn carrying only tool results, as produced after
    /// executing the tool calls from the previous assistant turn.
    pub fn tool_results(results: Vec<ToolResultEntry>) -> Self {
        Self {
            role: MessageRole::User,
            content: String::new(),
            tool_calls: Vec::new(),
            tool_results: results,
        }
    }

    /// Build an assistant turn, optionally carrying tool calls.
    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls,
            tool_results: Vec::new(),
        }
    }
}

/// Why a provider stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model produced one or more tool calls and is waiting on results.
    ToolUse,
    /// The model finished its turn with no further tool calls.
    EndTurn,
    /// Generation was cut off by `max_output_tokens`.
    MaxTokens,
    /// Any other provider-specific stop condition.
    Other,
}

/// Normalized result of one provider completion call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResult {
    /// Free-text content produced by the model, if any.
    pub content: String,
    /// Tool calls the model asked for, if any.
    pub tool_calls: Vec<ToolCallRequest>,
    /// Why the model stopped.
    pub stop_reason: StopReason,
    /// Input tokens billed for this call.
    pub input_tokens: u64,
    /// Output tokens billed for this call.
    pub output_tokens: u64,
}

impl CompletionResult {
    /// True when the model asked for at least one tool call.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_has_no_tool_calls_or_results() {
        let m = Message::user("do the thing");
        assert_eq!(m.role, MessageRole::User);
        assert!(m.tool_calls.is_empty());
        assert!(m.tool_results.is_empty());
    }

    #[test]
    fn completion_result_reports_tool_calls() {
        let result = CompletionResult {
            content: String::new(),
            tool_calls: vec![ToolCallRequest {
                id: "call_1".into(),
                name: "read_file".into(),
                arguments: serde_json::json!({"path": "a.txt"}),
            }],
            stop_reason: StopReason::ToolUse,
            input_tokens: 10,
            output_tokens: 5,
        };
        assert!(result.has_tool_calls());
    }

    #[test]
    fn message_round_trips_through_json() {
        let m = Message::assistant(
            "",
            vec![ToolCallRequest {
                id: "call_1".into(),
                name: "list_files".into(),
                arguments: serde_json::json!({}),
            }],
        );
        let encoded = serde_json::to_string(&m).unwrap();
        let decoded: Message = serde_json::from_str(&encoded).unwrap();
        assert_eq!(m, decoded);
    }
}
