//! Per-product render job definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use validator::Validate;

use crate::encoding::EncodingConfig;
use crate::settings::{AudioLevels, LogoPlacement, SubtitleStyle};

/// Catalog identifier of a product (e.g. an ASIN).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    /// Create from an existing string, trimming surrounding whitespace.
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(s.as_ref().trim().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Output canvas geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    /// 1920×1080, the only canvas products are rendered to.
    pub const FULL_HD: Canvas = Canvas {
        width: 1920,
        height: 1080,
    };
}

impl Default for Canvas {
    fn default() -> Self {
        Self::FULL_HD
    }
}

/// Everything needed to render one product, self-contained so it can be
/// shipped to a worker process as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct ProductRenderJob {
    pub product_id: ProductId,

    /// Ordered media sequence (slot 0 first)
    #[validate(length(min = 1, message = "at least one media file is required"))]
    pub media: Vec<PathBuf>,

    /// Pre-synthesized narration audio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narration_audio: Option<PathBuf>,

    /// Background music
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_audio: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<PathBuf>,

    /// Clip appended after the body (first 3 seconds only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outro_clip: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_text: Option<String>,

    #[serde(default)]
    pub canvas: Canvas,

    #[serde(default)]
    #[validate(nested)]
    pub logo_placement: LogoPlacement,

    #[serde(default)]
    #[validate(nested)]
    pub subtitle_style: SubtitleStyle,

    #[serde(default)]
    #[validate(nested)]
    pub audio: AudioLevels,

    #[serde(default)]
    pub encoding: EncodingConfig,

    /// Trim-and-speed treatment for the first media slot
    #[serde(default)]
    pub cut_hero_clip: bool,

    /// Directory receiving the rendered file
    pub output_root: PathBuf,
}

impl ProductRenderJob {
    /// Create a job with default settings.
    pub fn new(product_id: ProductId, media: Vec<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            product_id,
            media,
            narration_audio: None,
            background_audio: None,
            logo: None,
            outro_clip: None,
            subtitle_text: None,
            canvas: Canvas::FULL_HD,
            logo_placement: LogoPlacement::default(),
            subtitle_style: SubtitleStyle::default(),
            audio: AudioLevels::default(),
            encoding: EncodingConfig::default(),
            cut_hero_clip: false,
            output_root: output_root.into(),
        }
    }

    /// Deterministic output location: `{output_root}/{product_id}.{container}`.
    pub fn output_path(&self) -> PathBuf {
        self.output_root
            .join(format!("{}.{}", self.product_id, self.encoding.container))
    }

    /// Job-unique location of the trimmed narration track.
    pub fn narration_trim_path(&self) -> PathBuf {
        self.output_root
            .join(format!("{}_narration.wav", self.product_id))
    }

    /// Subtitle text, if any non-blank text was supplied.
    pub fn subtitle(&self) -> Option<&str> {
        self.subtitle_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> ProductRenderJob {
        ProductRenderJob::new(
            ProductId::new(" B00TEST01 "),
            vec![PathBuf::from("a.mp4")],
            "/renders",
        )
    }

    #[test]
    fn test_output_path_is_deterministic() {
        let job = job();
        assert_eq!(job.output_path(), PathBuf::from("/renders/B00TEST01.mp4"));
        assert_eq!(
            job.narration_trim_path(),
            PathBuf::from("/renders/B00TEST01_narration.wav")
        );
    }

    #[test]
    fn test_empty_media_rejected() {
        let mut job = job();
        assert!(job.validate().is_ok());
        job.media.clear();
        assert!(job.validate().is_err());
    }

    #[test]
    fn test_blank_subtitle_ignored() {
        let mut job = job();
        job.subtitle_text = Some("   ".to_string());
        assert_eq!(job.subtitle(), None);
        job.subtitle_text = Some(" Door Switch ".to_string());
        assert_eq!(job.subtitle(), Some("Door Switch"));
    }

    #[test]
    fn test_json_roundtrip_keeps_paths() {
        let mut job = job();
        job.logo = Some(PathBuf::from("/assets/logo.png"));
        let json = serde_json::to_string(&job).unwrap();
        let back: ProductRenderJob = serde_json::from_str(&json).unwrap();
        assert_eq!(back.logo, job.logo);
        assert_eq!(back.product_id, job.product_id);
        assert_eq!(back.canvas, Canvas::FULL_HD);
    }
}
