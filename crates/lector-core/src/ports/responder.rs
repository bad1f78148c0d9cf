//! Conversational responder port (the hosted AI chat collaborator).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::CapabilityError;

/// How much effort the responder should spend on an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Low-latency answer.
    #[default]
    Fast,

    /// Slower, deliberate answer.
    Thinking,
}

/// Produces a spoken-style reply to a user transcript.
#[async_trait]
pub trait TextResponder: Send + Sync {
    /// Answer `transcript`. The reply may embed playable media links.
    async fn respond(&self, transcript: &str, mode: ResponseMode) -> Result<String, CapabilityError>;
}
