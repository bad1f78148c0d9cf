//! Detection of playable media references in responder replies.
//!
//! A reply that links to a video or an audio/video file is going to be played
//! next to the microphone, so the dialogue loop must not resume listening on
//! its own after speaking it.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::text::collapse_whitespace;

/// File extensions treated as directly playable media.
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "aac", "flac"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "mkv"];

static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]*)\]\((https?://[^\s)]+)\)").expect("valid markdown link regex")
});

static BARE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>()\[\]"']+"#).expect("valid url regex")
});

static YOUTUBE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://(?:(?:www|m|music)\.)?(?:youtube\.com/(?:watch\?(?:[^#\s]*&)?v=|shorts/|embed/|live/)|youtu\.be/)[A-Za-z0-9_-]{6,}",
    )
    .expect("valid youtube regex")
});

/// What kind of media a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// A YouTube watch, short, or embed link.
    Video,
    /// A direct link to an audio file.
    AudioFile,
    /// A direct link to a video file.
    VideoFile,
}

/// A playable media link found in text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    pub url: String,
    pub kind: MediaKind,
}

/// Trailing characters that belong to the sentence, not the URL.
fn trim_url(url: &str) -> &str {
    url.trim_end_matches(['.', ',', ';', ':', '!', '?'])
}

/// Classify a single URL.
fn classify(url: &str) -> Option<MediaKind> {
    if YOUTUBE.is_match(url) {
        return Some(MediaKind::Video);
    }

    let path = url.split(['?', '#']).next().unwrap_or(url);
    let (_, extension) = path.rsplit_once('.')?;
    if extension.contains('/') {
        return None;
    }
    let extension = extension.to_ascii_lowercase();

    if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        Some(MediaKind::AudioFile)
    } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        Some(MediaKind::VideoFile)
    } else {
        None
    }
}

/// First playable media reference in `text`, in reading order.
pub fn detect_media(text: &str) -> Option<MediaReference> {
    BARE_URL.find_iter(text).find_map(|m| {
        let url = trim_url(m.as_str());
        classify(url).map(|kind| MediaReference {
            url: url.to_string(),
            kind,
        })
    })
}

/// Remove media links from `text` so the rest can be spoken.
///
/// Markdown links to media keep their title; bare media URLs are dropped.
/// Links to anything else are left alone.
pub fn strip_media_references(text: &str) -> String {
    let without_links = MARKDOWN_LINK.replace_all(text, |caps: &regex::Captures<'_>| {
        if classify(trim_url(&caps[2])).is_some() {
            caps[1].to_string()
        } else {
            caps[0].to_string()
        }
    });

    let without_urls = BARE_URL.replace_all(&without_links, |caps: &regex::Captures<'_>| {
        let full = &caps[0];
        let url = trim_url(full);
        if classify(url).is_some() {
            full[url.len()..].to_string()
        } else {
            full.to_string()
        }
    });

    collapse_whitespace(&without_urls)
}
