//! Media item classification.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Playback length assigned to every still image, in seconds.
pub const STILL_IMAGE_SECONDS: f64 = 3.0;

/// File extensions probed as video.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];

/// File extensions treated as still images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Kind of a media file, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    /// Classify a path by extension (case-insensitive).
    ///
    /// Returns `None` for extensions that are neither a known video nor a
    /// known still-image format.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())?;

        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Image => "image",
        }
    }
}

/// One entry of a product's ordered media sequence.
///
/// Built fresh for every render from the job's media paths; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MediaItem {
    /// Local file path
    pub path: PathBuf,
    /// Video or still image
    pub kind: MediaKind,
    /// Playback duration in seconds (0.0 when unknown)
    pub probed_duration: f64,
    /// Position in the product's media sequence
    pub slot_index: usize,
}

impl MediaItem {
    pub fn new(path: impl Into<PathBuf>, kind: MediaKind, probed_duration: f64, slot_index: usize) -> Self {
        Self {
            path: path.into(),
            kind,
            probed_duration: probed_duration.max(0.0),
            slot_index,
        }
    }

    pub fn is_still(&self) -> bool {
        self.kind == MediaKind::Image
    }
}
