//! Local stand-in for the hosted chat responder.

use std::time::Duration;

use async_trait::async_trait;
use lector_core::{CapabilityError, ResponseMode, TextResponder};

/// Answers by repeating the transcript. Thinking mode takes a moment first.
///
/// Links in the transcript are echoed too, so saying a video link exercises
/// the media hold of the dialogue loop.
#[derive(Debug, Clone)]
pub struct EchoResponder {
    thinking_delay: Duration,
}

impl EchoResponder {
    pub const fn new(thinking_delay: Duration) -> Self {
        Self { thinking_delay }
    }
}

impl Default for EchoResponder {
    fn default() -> Self {
        Self::new(Duration::from_millis(800))
    }
}

#[async_trait]
impl TextResponder for EchoResponder {
    async fn respond(&self, transcript: &str, mode: ResponseMode) -> Result<String, CapabilityError> {
        if transcript.trim().is_empty() {
            return Err(CapabilityError::Responder("nothing to answer".to_string()));
        }
        match mode {
            ResponseMode::Fast => Ok(format!("You said: {transcript}")),
            ResponseMode::Thinking => {
                tokio::time::sleep(self.thinking_delay).await;
                Ok(format!("I thought it over. You said: {transcript}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    #[tokio::test]
    async fn fast_mode_echoes() {
        let reply = assert_ok!(EchoResponder::default().respond("hello", ResponseMode::Fast).await);
        assert_eq!(reply, "You said: hello");
    }

    #[tokio::test(start_paused = true)]
    async fn thinking_mode_waits_first() {
        let responder = EchoResponder::new(Duration::from_secs(2));
        let started = tokio::time::Instant::now();

        let reply = assert_ok!(responder.respond("why", ResponseMode::Thinking).await);

        assert!(started.elapsed() >= Duration::from_secs(2));
        assert!(reply.ends_with("You said: why"));
    }

    #[tokio::test]
    async fn blank_transcripts_fail() {
        assert_err!(EchoResponder::default().respond("  ", ResponseMode::Fast).await);
    }
}
