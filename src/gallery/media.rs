//! Media items and file-type classification

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::StoredObject;

/// Coarse media category of a stored object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Audio,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Audio => "audio",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm"];
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav"];

/// Category for names that match neither the image nor the video group.
///
/// Unknown extensions (`.txt`, `.xyz`, no extension at all) land here too:
/// the listing is never filtered, so everything gets a category.
pub const FALLBACK_MEDIA_TYPE: MediaType = MediaType::Audio;

/// Lowercased extension after the last dot, if any
pub fn extension(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Classify a stored object by its name alone
pub fn classify(name: &str) -> MediaType {
    match extension(name) {
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => MediaType::Image,
        Some(ext) if VIDEO_EXTENSIONS.contains(&ext.as_str()) => MediaType::Video,
        _ => FALLBACK_MEDIA_TYPE,
    }
}

/// MIME type to upload a file with, from its extension
pub fn content_type(name: &str) -> &'static str {
    match extension(name).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        _ => "application/octet-stream",
    }
}

/// One entry in the gallery listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub name: String,
    pub url: String,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub media_type: MediaType,
}

impl MediaItem {
    pub fn from_object(object: StoredObject, url: String) -> Self {
        let media_type = classify(&object.name);
        Self {
            name: object.name,
            url,
            created_at: object.created_at,
            media_type,
        }
    }
}
