//! Synthesis voice selection.

use lector_core::{LanguageTag, SpeechSynthesizer, SynthesisVoice};

/// Pick the best voice for `language`.
///
/// Preference order: exact locale match, then any voice of the same language
/// family (e.g. `ta-LK` for `ta-IN`), then the platform default voice.
/// Returns `None` when nothing fits; the synthesizer then uses its own default.
pub fn select_voice<'a>(
    voices: &'a [SynthesisVoice],
    language: &LanguageTag,
) -> Option<&'a SynthesisVoice> {
    voices
        .iter()
        .find(|voice| language.matches_exactly(&voice.language))
        .or_else(|| {
            voices
                .iter()
                .find(|voice| language.same_family(&voice.language))
        })
        .or_else(|| voices.iter().find(|voice| voice.is_default))
}

/// Engine-owned cache of the synthesizer's voice list.
///
/// Platforms enumerate voices asynchronously and may report an empty list at
/// first, so an empty cache is re-queried on every lookup.
#[derive(Debug, Default)]
pub struct VoiceCache {
    voices: Vec<SynthesisVoice>,
}

impl VoiceCache {
    /// Create an empty cache.
    pub const fn new() -> Self {
        Self { voices: Vec::new() }
    }

    /// Cached voices, refreshed from `synth` while empty.
    pub fn voices(&mut self, synth: &dyn SpeechSynthesizer) -> &[SynthesisVoice] {
        if self.voices.is_empty() {
            self.voices = synth.voices();
            if !self.voices.is_empty() {
                tracing::debug!(count = self.voices.len(), "Synthesis voices loaded");
            }
        }
        &self.voices
    }

    /// Voice id to use for `language`, if any fits.
    pub fn pick(&mut self, synth: &dyn SpeechSynthesizer, language: &LanguageTag) -> Option<String> {
        select_voice(self.voices(synth), language).map(|voice| voice.id.clone())
    }
}
