//! Rendered provider audio: raw little-endian PCM16 plus its format.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use lector_core::{AudioBuffer, PcmFormat};

use crate::error::VoiceError;

/// Pre-synthesized audio obtained from an external provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedAudio {
    bytes: Vec<u8>,
    format: PcmFormat,
}

impl RenderedAudio {
    /// Wrap raw PCM16 bytes.
    pub const fn new(bytes: Vec<u8>, format: PcmFormat) -> Self {
        Self { bytes, format }
    }

    /// Decode the provider's base64 payload.
    pub fn from_base64(encoded: &str, format: PcmFormat) -> Result<Self, VoiceError> {
        let bytes = STANDARD.decode(encoded.trim())?;
        Ok(Self::new(bytes, format))
    }

    /// Raw bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared format.
    pub const fn format(&self) -> PcmFormat {
        self.format
    }

    /// Whether there is no audio at all.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Split into bytes and format.
    pub fn into_parts(self) -> (Vec<u8>, PcmFormat) {
        (self.bytes, self.format)
    }
}

/// Convert interleaved little-endian signed 16-bit PCM to `f32` samples.
///
/// Samples are scaled by `1 / 32768` into `[-1.0, 1.0)`.
pub fn decode_pcm16(bytes: &[u8], format: PcmFormat) -> Result<AudioBuffer, VoiceError> {
    if format.channels == 0 || format.sample_rate == 0 {
        return Err(VoiceError::InvalidPcm(format!(
            "unsupported format: {} Hz, {} channels",
            format.sample_rate, format.channels
        )));
    }
    if bytes.len() % 2 != 0 {
        return Err(VoiceError::InvalidPcm(format!(
            "odd byte count {} for 16-bit samples",
            bytes.len()
        )));
    }

    let sample_count = bytes.len() / 2;
    if sample_count % usize::from(format.channels) != 0 {
        return Err(VoiceError::InvalidPcm(format!(
            "{sample_count} samples do not divide into {} channels",
            format.channels
        )));
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect();

    Ok(AudioBuffer {
        samples,
        sample_rate: format.sample_rate,
        channels: format.channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::float_cmp)]
    fn decodes_little_endian_samples() {
        let bytes = [0x00, 0x00, 0x00, 0x40, 0x00, 0x80, 0xff, 0x7f];
        let buffer = decode_pcm16(&bytes, PcmFormat::default()).unwrap();

        assert_eq!(buffer.samples[0], 0.0);
        assert_eq!(buffer.samples[1], 0.5);
        assert_eq!(buffer.samples[2], -1.0);
        assert!(buffer.samples[3] < 1.0 && buffer.samples[3] > 0.999);
        assert_eq!(buffer.sample_rate, 24_000);
        assert_eq!(buffer.frames(), 4);
    }

    #[test]
    fn rejects_odd_byte_count() {
        let err = decode_pcm16(&[0, 0, 0], PcmFormat::default()).unwrap_err();
        assert!(matches!(err, VoiceError::InvalidPcm(_)));
    }

    #[test]
    fn rejects_partial_stereo_frame() {
        let format = PcmFormat {
            sample_rate: 24_000,
            channels: 2,
        };
        let err = decode_pcm16(&[0, 0, 0, 0, 0, 0], format).unwrap_err();
        assert!(matches!(err, VoiceError::InvalidPcm(_)));
    }

    #[test]
    fn rejects_zero_channels() {
        let format = PcmFormat {
            sample_rate: 24_000,
            channels: 0,
        };
        assert!(decode_pcm16(&[0, 0], format).is_err());
    }

    #[test]
    fn base64_payload_is_decoded() {
        let audio = RenderedAudio::from_base64(" AAAAQA== ", PcmFormat::default()).unwrap();
        assert_eq!(audio.bytes(), &[0x00, 0x00, 0x00, 0x40]);
        assert!(!audio.is_empty());
    }

    #[test]
    fn invalid_base64_is_an_error() {
        let err = RenderedAudio::from_base64("not base64!", PcmFormat::default()).unwrap_err();
        assert!(matches!(err, VoiceError::InvalidBase64(_)));
    }
}
