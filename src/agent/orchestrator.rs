//! Turn orchestration: SelectingTool → ExecutingTool → Synthesizing → Done.
//!
//! A failing tool degrades the reply; a failing model call (or the
//! pipeline deadline) drops to a single minimal prompt; if that fails
//! too the caller gets a fixed apology. [`Agent::process_user_query`]
//! never returns an error.

use super::synthesizer::{self, ToolOutcome};
use super::{complete_text, prompt, selector};
use crate::config::AlooConfig;
use crate::llm::{LanguageModel, LlmError};
use crate::tools::ToolRegistry;
use crate::types::{AgentResponse, ConversationTurn, ToolCall};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

pub const FALLBACK_NOTE: &str = "\n\n(Note: Some advanced features are temporarily unavailable)";
pub const APOLOGY: &str =
    "I'm sorry, I'm experiencing some technical difficulties right now. Please try again in a moment.";

/// Why the full pipeline was abandoned for the fallback.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentSettings {
    pub selection_history_window: usize,
    /// Bound on selection + tool + synthesis. `None` means unbounded.
    pub pipeline_timeout: Option<Duration>,
    pub fallback_timeout: Option<Duration>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            selection_history_window: 20,
            pipeline_timeout: Some(Duration::from_secs(60)),
            fallback_timeout: Some(Duration::from_secs(20)),
        }
    }
}

impl AgentSettings {
    pub fn from_config(config: &AlooConfig) -> Self {
        Self {
            selection_history_window: config.selection_history_window,
            pipeline_timeout: config.pipeline_timeout(),
            fallback_timeout: config.fallback_timeout(),
        }
    }
}

async fn bounded<T, F>(limit: Option<Duration>, fut: F) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, PipelineError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| PipelineError::DeadlineExceeded(limit))?,
        None => fut.await,
    }
}

/// Stateless per turn; share one instance across requests.
pub struct Agent {
    llm: Arc<dyn LanguageModel>,
    tools: Arc<ToolRegistry>,
    settings: AgentSettings,
}

impl Agent {
    pub fn new(llm: Arc<dyn LanguageModel>, tools: Arc<ToolRegistry>, settings: AgentSettings) -> Self {
        Self {
            llm,
            tools,
            settings,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answer one user message given prior turns (oldest first).
    pub async fn process_user_query(
        &self,
        message: &str,
        history: &[ConversationTurn],
    ) -> AgentResponse {
        match bounded(self.settings.pipeline_timeout, self.run(message, history)).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Agent pipeline failed, using fallback: {}", e);
                self.fallback(message, history).await
            }
        }
    }

    async fn run(
        &self,
        message: &str,
        history: &[ConversationTurn],
    ) -> Result<AgentResponse, PipelineError> {
        let call = selector::select_tool(
            self.llm.as_ref(),
            &self.tools,
            message,
            history,
            self.settings.selection_history_window,
        )
        .await?;

        let outcome = self.execute_tool(&call).await;
        let text = synthesizer::synthesize(self.llm.as_ref(), message, history, &outcome).await?;

        Ok(AgentResponse {
            text,
            tool_output: outcome.into_output(),
        })
    }

    async fn execute_tool(&self, call: &ToolCall) -> ToolOutcome {
        let Some(name) = call.tool.as_deref() else {
            return ToolOutcome::Skipped;
        };
        let Some(tool) = self.tools.lookup(name) else {
            warn!("Model selected unknown tool '{}', answering without it", name);
            return ToolOutcome::Skipped;
        };

        info!("Executing tool: {}", tool.name());
        match tool.execute(&call.params).await {
            Ok(output) => ToolOutcome::Output(output),
            Err(e) => {
                warn!("Tool {} failed: {}", tool.name(), e);
                ToolOutcome::Failed(format!("{} tool failed: {}", tool.name(), e))
            }
        }
    }

    async fn fallback(&self, message: &str, history: &[ConversationTurn]) -> AgentResponse {
        let prompt = prompt::fallback_prompt(history, message);
        let attempt = async {
            complete_text(self.llm.as_ref(), &prompt)
                .await
                .map_err(PipelineError::from)
        };

        match bounded(self.settings.fallback_timeout, attempt).await {
            Ok(text) => AgentResponse {
                text: format!("{}{}", text, FALLBACK_NOTE),
                tool_output: None,
            },
            Err(e) => {
                error!("Fallback completion failed: {}", e);
                AgentResponse {
                    text: APOLOGY.to_string(),
                    tool_output: None,
                }
            }
        }
    }
}
