//! Prompt builders for the three model calls of a turn.
//!
//! 1. Selection: tool catalog + history + message, answer is strict JSON
//! 2. Synthesis: persona + last 5 turns + message + tool result or error
//! 3. Fallback: persona + last 3 turns + message, no tools

use super::injection_defense::sanitize_context;
use crate::tools::ToolOutput;
use crate::types::ConversationTurn;
use tracing::debug;

/// History turns kept in the synthesis prompt.
pub const SYNTHESIS_HISTORY_WINDOW: usize = 5;
/// History turns kept in the fallback prompt.
pub const FALLBACK_HISTORY_WINDOW: usize = 3;
/// Upper bound on serialized tool output embedded in a prompt.
pub const MAX_TOOL_JSON_CHARS: usize = 12_000;

const SELECTION_GUIDANCE: &str = r#"
Based on the user's message and conversation history, determine if any tool should be used.

IMPORTANT: For Wikipedia tool, look for these patterns:
- Questions starting with: "What is", "Who is", "Who was", "Explain", "Tell me about", "Define"
- Educational/factual questions about: people, places, concepts, history, science, etc.
- Examples: "What is machine learning?", "Who is Einstein?", "Tell me about Paris", "Explain quantum physics"
"#;

const SELECTION_FORMAT: &str = r#"
Respond ONLY with valid JSON in this exact format:
{
  "tool": "<tool_name_or_null>",
  "params": {<parameters_object>}
}

Examples:
- For weather: {"tool": "weather", "params": {"location": "London"}}
- For GitHub: {"tool": "github", "params": {"query": "react", "type": "search"}}
- For Wikipedia: {"tool": "wikipedia", "params": {"query": "machine learning"}}
- For Giphy: {"tool": "giphy", "params": {"query": "funny cats", "type": "gif"}}
- For HTTP requests: {"tool": "webclient", "params": {"method": "GET", "url": "https://api.example.com/users"}}
- For general chat: {"tool": null, "params": {}}

JSON Response:"#;

const SYNTHESIS_INSTRUCTIONS: &str = "Provide a natural, helpful response to the user. \
If tool data is available, incorporate it naturally into your response. \
If there was a tool error, acknowledge it gracefully and provide alternative help.\n\n\
Keep your response conversational and engaging. \
Respond in 1-3 sentences unless more detail is specifically requested.";

/// Render the last `window` turns as `Role: text` lines.
pub fn render_history(history: &[ConversationTurn], window: usize) -> String {
    let start = history.len().saturating_sub(window);
    history[start..]
        .iter()
        .map(|turn| format!("{}: {}", turn.role, sanitize_context(&turn.text)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut `text` to at most `max` characters, marking the cut.
fn clip(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}\n... [truncated]", &text[..idx]),
        None => text.to_string(),
    }
}

pub fn selection_prompt(
    catalog: &str,
    history: &[ConversationTurn],
    message: &str,
    window: usize,
) -> String {
    let mut prompt = String::with_capacity(4096);
    prompt.push_str("\nYou are an AI assistant with access to the following tools:\n\n");
    prompt.push_str(catalog);
    prompt.push_str(SELECTION_GUIDANCE);
    prompt.push_str("\nConversation history:\n");
    prompt.push_str(&render_history(history, window));
    prompt.push_str(&format!(
        "\n\nCurrent user message: \"{}\"\n",
        sanitize_context(message)
    ));
    prompt.push_str(SELECTION_FORMAT);

    debug!("Selection prompt: {} chars", prompt.len());
    prompt
}

pub fn synthesis_prompt(
    history: &[ConversationTurn],
    message: &str,
    tool_output: Option<&ToolOutput>,
    tool_error: Option<&str>,
) -> String {
    let mut prompt = String::with_capacity(4096);
    prompt.push_str("\nYou are AlooChat, a helpful and friendly AI assistant.\n");

    if !history.is_empty() {
        prompt.push_str("\nConversation history:\n");
        prompt.push_str(&render_history(history, SYNTHESIS_HISTORY_WINDOW));
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "\nUser's current message: \"{}\"\n\n",
        sanitize_context(message)
    ));

    if let Some(output) = tool_output {
        prompt.push_str("Tool Result: ");
        prompt.push_str(&clip(&output.to_prompt_json(), MAX_TOOL_JSON_CHARS));
        prompt.push('\n');
    }
    if let Some(error) = tool_error {
        prompt.push_str(&format!("Tool Error: {}\n", error));
    }

    prompt.push('\n');
    prompt.push_str(SYNTHESIS_INSTRUCTIONS);
    prompt.push_str("\n\nResponse:");

    debug!("Synthesis prompt: {} chars", prompt.len());
    prompt
}

pub fn fallback_prompt(history: &[ConversationTurn], message: &str) -> String {
    let mut prompt = String::from("\nYou are AlooChat, a helpful AI assistant.\n");
    if !history.is_empty() {
        prompt.push_str("Conversation history:\n");
        prompt.push_str(&render_history(history, FALLBACK_HISTORY_WINDOW));
        prompt.push('\n');
    }
    prompt.push_str(&format!("User: {}\n\n", sanitize_context(message)));
    prompt.push_str("Respond naturally and helpfully:");
    prompt
}
