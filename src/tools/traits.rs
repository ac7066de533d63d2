//! Tool trait definition.

use super::params::Params;
use super::ToolOutput;
use async_trait::async_trait;
use thiserror::Error;

/// Static description of a tool, embedded verbatim into prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    /// Parameter name and a human-readable type/constraint note, in
    /// prompt order. Not machine-validated.
    pub parameters: &'static [(&'static str, &'static str)],
}

/// Why a tool invocation failed. `Display` is what the synthesizer sees.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Required credential is absent; detected before any network call.
    #[error("{0} not configured")]
    NotConfigured(&'static str),

    #[error("{0}")]
    InvalidParams(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Upstream(String),

    /// Target rejected by policy; no request was sent.
    #[error("{0}")]
    Security(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// A named capability the agent may invoke once per turn.
#[async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> &ToolDescriptor;

    /// Execute with model-supplied parameters.
    ///
    /// `params` come from model output and may be missing fields, carry
    /// wrong types or out-of-range values; implementations validate and
    /// clamp rather than trust them.
    async fn execute(&self, params: &Params) -> Result<ToolOutput, ToolError>;

    fn name(&self) -> &'static str {
        self.descriptor().name
    }

    /// Whether the credentials this tool needs are present.
    fn is_configured(&self) -> bool {
        true
    }
}
