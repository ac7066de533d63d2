//! Response synthesis: the second model call of a turn.

use super::{complete_text, prompt};
use crate::llm::{LanguageModel, LlmError};
use crate::tools::ToolOutput;
use crate::types::ConversationTurn;

/// What the tool step produced for this turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// No tool was selected, or the selected name is not registered.
    Skipped,
    Output(ToolOutput),
    /// Tool ran and failed; the message is narrated, not shown raw.
    Failed(String),
}

impl ToolOutcome {
    pub fn output(&self) -> Option<&ToolOutput> {
        match self {
            Self::Output(out) => Some(out),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn into_output(self) -> Option<ToolOutput> {
        match self {
            Self::Output(out) => Some(out),
            _ => None,
        }
    }
}

/// Produce the final reply text, trimmed.
pub async fn synthesize(
    llm: &dyn LanguageModel,
    message: &str,
    history: &[ConversationTurn],
    outcome: &ToolOutcome,
) -> Result<String, LlmError> {
    let prompt = prompt::synthesis_prompt(history, message, outcome.output(), outcome.error());
    complete_text(llm, &prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;

    #[tokio::test]
    async fn reply_is_trimmed() {
        let model = ScriptedModel::replying(&["\n  Hello there!  \n"]);
        let text = synthesize(&model, "hi", &[], &ToolOutcome::Skipped).await.unwrap();
        assert_eq!(text, "Hello there!");
    }

    #[tokio::test]
    async fn whitespace_reply_is_an_error() {
        let model = ScriptedModel::replying(&["   "]);
        let err = synthesize(&model, "hi", &[], &ToolOutcome::Skipped).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }

    #[tokio::test]
    async fn tool_error_reaches_the_prompt() {
        let model = ScriptedModel::replying(&["Sorry, weather is unavailable."]);
        let outcome = ToolOutcome::Failed("weather tool failed: OpenWeather API key not configured".into());
        synthesize(&model, "weather in Oslo?", &[], &outcome).await.unwrap();
        assert!(model.prompts()[0].contains("Tool Error: weather tool failed"));
    }
}
