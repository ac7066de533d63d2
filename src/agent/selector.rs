//! Tool selection: ask the model which tool (if any) fits the message.
//!
//! The model's reply is untrusted input. Anything that does not parse as
//! a `{tool, params}` object degrades to "no tool".

use super::prompt;
use crate::llm::{LanguageModel, LlmError};
use crate::tools::ToolRegistry;
use crate::types::{ConversationTurn, ToolCall};
use serde_json::Value;
use tracing::{debug, warn};

/// Run the selection prompt and parse the reply.
///
/// Only a failed model call is an error; a malformed or blank reply is not.
pub async fn select_tool(
    llm: &dyn LanguageModel,
    tools: &ToolRegistry,
    message: &str,
    history: &[ConversationTurn],
    window: usize,
) -> Result<ToolCall, LlmError> {
    let prompt = prompt::selection_prompt(&tools.describe_all(), history, message, window);
    let reply = llm.complete(&prompt).await?;
    let call = parse_tool_call(&reply);
    debug!("Selected tool: {:?}", call.tool);
    Ok(call)
}

fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string (`json`, `JSON`, ...) on the opening line.
        text = match rest.find('\n') {
            Some(idx) => &rest[idx + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }
    text.trim_end().trim_end_matches("```").trim()
}

fn parse_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    if let Ok(Value::Object(map)) = serde_json::from_str(text) {
        return Some(map);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str(&text[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Parse a selection reply into a [`ToolCall`].
pub fn parse_tool_call(raw: &str) -> ToolCall {
    let Some(mut object) = parse_object(strip_code_fence(raw)) else {
        warn!("Failed to parse tool selection reply: {}", raw);
        return ToolCall::none();
    };

    let tool = match object.get("tool") {
        Some(Value::String(name)) => {
            let name = name.trim().to_ascii_lowercase();
            match name.as_str() {
                "" | "null" | "none" => None,
                _ => Some(name),
            }
        }
        _ => None,
    };

    let params = match object.remove("params") {
        Some(Value::Object(params)) => params,
        _ => serde_json::Map::new(),
    };

    ToolCall { tool, params }
}
