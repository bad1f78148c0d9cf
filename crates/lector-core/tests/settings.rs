//! Integration tests for speech settings.
//!
//! # What is tested
//!
//! - Settings persisted by older versions (missing fields) still load
//! - Partial updates set, keep, and reset individual fields
//! - Validation of merged settings

use lector_core::{
    LanguageTag, ReadingRate, Settings, SettingsError, SettingsUpdate, validate_settings,
};

#[test]
fn sparse_json_loads_with_defaults() {
    let settings: Settings = serde_json::from_str(r#"{ "language": "ta-IN" }"#).unwrap();

    assert_eq!(settings.effective_language(), LanguageTag::tamil());
    assert_eq!(settings.effective_reading_rate(), ReadingRate::Normal);
    assert!(settings.effective_voice_feedback());
    assert!(validate_settings(&settings).is_ok());
}

#[test]
fn reading_rate_uses_snake_case() {
    let settings: Settings = serde_json::from_str(r#"{ "reading_rate": "fast" }"#).unwrap();
    assert_eq!(settings.reading_rate, Some(ReadingRate::Fast));

    let json = serde_json::to_value(&settings).unwrap();
    assert_eq!(json["reading_rate"], "fast");
}

#[test]
fn update_sets_keeps_and_resets() {
    let mut settings = Settings::with_defaults();
    settings.merge(&SettingsUpdate {
        reading_rate: Some(Some(ReadingRate::Slow)),
        voice_feedback: Some(None),
        ..SettingsUpdate::default()
    });

    assert_eq!(settings.reading_rate, Some(ReadingRate::Slow));
    assert_eq!(settings.voice_feedback, None, "reset to default");
    assert!(settings.effective_voice_feedback());
    assert_eq!(settings.language, Some(LanguageTag::english()), "untouched");
}

#[test]
fn merged_settings_are_validated_as_a_whole() {
    let mut settings = Settings::with_defaults();
    settings.merge(&SettingsUpdate {
        restart_delay_ms: Some(Some(2_000)),
        max_restart_delay_ms: Some(Some(1_000)),
        ..SettingsUpdate::default()
    });

    assert_eq!(
        validate_settings(&settings),
        Err(SettingsError::InvalidMaxRestartDelay {
            base: 2_000,
            max: 1_000
        })
    );
}
