//! Rendered-audio port: decode provider audio and play it sample-accurately.
//!
//! | Type | Role |
//! |---|---|
//! | [`AudioBackend`] | Opens an [`AudioContext`] on demand |
//! | [`AudioContext`] | Long-lived output device; decodes buffers and starts nodes |
//! | [`OutputNode`] | One playing buffer with suspend/resume/stop |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::CapabilityError;

/// Callback fired once when an output node drains naturally.
///
/// Never fired for nodes that were stopped.
pub type PlaybackDoneCallback = Box<dyn FnOnce() + Send + 'static>;

/// Layout of raw PCM audio delivered by the rendering provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PcmFormat {
    /// Samples per second per channel.
    pub sample_rate: u32,

    /// Interleaved channel count.
    pub channels: u16,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            channels: 1,
        }
    }
}

/// Decoded, playable audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Interleaved f32 samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,

    /// Samples per second per channel.
    pub sample_rate: u32,

    /// Interleaved channel count.
    pub channels: u16,
}

impl AudioBuffer {
    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / usize::from(self.channels)
    }

    /// Playback duration.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        #[allow(clippy::cast_precision_loss)]
        let secs = self.frames() as f64 / f64::from(self.sample_rate);
        Duration::from_secs_f64(secs)
    }
}

/// Opens audio output contexts.
pub trait AudioBackend: Send + Sync {
    /// Open a new context on the default output device.
    fn open(&self) -> Result<Arc<dyn AudioContext>, CapabilityError>;
}

/// A live audio output context.
#[async_trait]
pub trait AudioContext: Send + Sync {
    /// Whether the context has been closed and must be reopened.
    fn is_closed(&self) -> bool;

    /// Decode raw provider bytes into a playable buffer.
    async fn decode(&self, bytes: Vec<u8>, format: PcmFormat) -> Result<AudioBuffer, CapabilityError>;

    /// Start playing `buffer` immediately. `on_ended` fires on natural completion only.
    fn play(
        &self,
        buffer: AudioBuffer,
        on_ended: PlaybackDoneCallback,
    ) -> Result<Box<dyn OutputNode>, CapabilityError>;
}

/// One buffer connected to the output.
pub trait OutputNode: Send + Sync {
    /// Suspend output, keeping the position.
    fn suspend(&self);

    /// Continue from the suspended position.
    fn resume(&self);

    /// Stop and disconnect. Idempotent; suppresses the completion callback.
    fn stop(&self);
}
