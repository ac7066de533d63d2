//! Language-model collaborator.
//!
//! The agent only ever needs one capability from a model: turn a prompt
//! into text. Everything provider-specific lives behind [`LanguageModel`].

pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single completion call.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("language model API key not configured")]
    NotConfigured,

    #[error("language model request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("language model returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("language model blocked the prompt: {0}")]
    Blocked(String),

    #[error("language model returned an empty completion")]
    EmptyResponse,

    #[error("failed to decode language model response: {0}")]
    Decode(String),
}

/// A text-completion backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a single prompt.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted model double shared by the agent tests.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned replies in order and records every prompt.
    ///
    /// Once the script runs out every call fails.
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn replying(replies: &[&str]) -> Self {
            Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
        }

        pub fn failing() -> Self {
            Self::new(Vec::new())
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::Api {
                    status: 503,
                    body: "script exhausted".into(),
                }))
        }
    }
}
