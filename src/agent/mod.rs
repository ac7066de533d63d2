//! The tool-using agent: select, execute, synthesize, fall back.

pub mod injection_defense;
pub mod orchestrator;
pub mod prompt;
pub mod selector;
pub mod synthesizer;

pub use orchestrator::{Agent, AgentSettings, PipelineError, APOLOGY, FALLBACK_NOTE};
pub use selector::{parse_tool_call, select_tool};
pub use synthesizer::{synthesize, ToolOutcome};

use crate::llm::{LanguageModel, LlmError};

/// One completion, trimmed. Blank output counts as a failure; used for
/// the prose replies, not for tool selection.
pub(crate) async fn complete_text(llm: &dyn LanguageModel, prompt: &str) -> Result<String, LlmError> {
    let text = llm.complete(prompt).await?;
    let text = text.trim();
    if text.is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text.to_string())
}
