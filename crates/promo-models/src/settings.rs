//! Overlay, subtitle and audio settings.
//!
//! `RenderSettings` is assembled once per batch (from the manifest) and copied
//! by value into every `ProductRenderJob`; the render path never reads
//! settings from anywhere else.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::{Validate, ValidationError};

use crate::encoding::EncodingConfig;

/// Brand whose logo is anchored to the right edge.
pub const RIGHT_ANCHORED_BRAND: &str = "BlueStars";

/// Default logo width as a percentage of the canvas width.
pub const DEFAULT_LOGO_SCALE_PERCENT: u32 = 15;
/// Default logo offset from the anchored edge (pixels)
pub const DEFAULT_LOGO_OFFSET: i32 = 50;

pub const DEFAULT_SUBTITLE_Y: i32 = 100;
pub const DEFAULT_SUBTITLE_FONT_SIZE: u32 = 85;
pub const DEFAULT_SUBTITLE_MIN_FONT_SIZE: u32 = 30;
pub const DEFAULT_SUBTITLE_MARGIN: u32 = 100;

pub const DEFAULT_NARRATION_VOLUME: f64 = 1.0;
pub const DEFAULT_BACKGROUND_VOLUME: f64 = 0.1;

// =============================================================================
// Logo
// =============================================================================

/// Which canvas edge the logo is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnchorSide {
    #[default]
    Left,
    Right,
}

impl AnchorSide {
    /// Anchor side used for a brand.
    pub fn for_brand(brand: &str) -> Self {
        if brand == RIGHT_ANCHORED_BRAND {
            AnchorSide::Right
        } else {
            AnchorSide::Left
        }
    }
}

/// Logo overlay placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct LogoPlacement {
    /// Logo width as a percentage of the canvas width
    #[validate(range(min = 1, max = 100))]
    pub scale_percent: u32,
    /// Horizontal offset from the anchored edge (pixels)
    pub x: i32,
    /// Vertical offset from the top edge (pixels)
    pub y: i32,
    /// Edge the horizontal offset is measured from
    #[serde(default)]
    pub anchor: AnchorSide,
}

impl Default for LogoPlacement {
    fn default() -> Self {
        Self {
            scale_percent: DEFAULT_LOGO_SCALE_PERCENT,
            x: DEFAULT_LOGO_OFFSET,
            y: DEFAULT_LOGO_OFFSET,
            anchor: AnchorSide::Left,
        }
    }
}

impl LogoPlacement {
    /// Logo width in pixels for a canvas width.
    pub fn width_for(&self, canvas_width: u32) -> u32 {
        canvas_width * self.scale_percent / 100
    }
}

// =============================================================================
// Subtitle
// =============================================================================

/// Horizontal subtitle alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Burned-in subtitle style.
///
/// Fields left out of a manifest keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[validate(schema(function = "validate_font_sizes"))]
#[serde(default)]
pub struct SubtitleStyle {
    pub align: SubtitleAlign,
    /// Vertical offset from the top edge (pixels)
    pub y: i32,
    /// Starting (largest) font size
    #[validate(range(min = 1))]
    pub font_size: u32,
    /// Smallest font size the fitter may shrink to
    #[validate(range(min = 1))]
    pub min_font_size: u32,
    pub font_color: String,
    pub border_width: u32,
    pub border_color: String,
    /// Safe margin kept free on both sides (pixels)
    pub margin: u32,
    /// Font file used for both measuring and drawing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_file: Option<PathBuf>,
}

fn validate_font_sizes(style: &SubtitleStyle) -> Result<(), ValidationError> {
    if style.min_font_size > style.font_size {
        return Err(ValidationError::new("min_font_size_exceeds_font_size"));
    }
    Ok(())
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            align: SubtitleAlign::Center,
            y: DEFAULT_SUBTITLE_Y,
            font_size: DEFAULT_SUBTITLE_FONT_SIZE,
            min_font_size: DEFAULT_SUBTITLE_MIN_FONT_SIZE,
            font_color: "#000000".to_string(),
            border_width: 2,
            border_color: "#FFFFFF".to_string(),
            margin: DEFAULT_SUBTITLE_MARGIN,
            font_file: None,
        }
    }
}

// =============================================================================
// Audio
// =============================================================================

/// How the mixed audio track length is chosen by `amix`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum MixDuration {
    #[default]
    Shortest,
    First,
    Longest,
}

impl MixDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            MixDuration::Shortest => "shortest",
            MixDuration::First => "first",
            MixDuration::Longest => "longest",
        }
    }
}

/// Volume multipliers for the two audio tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(default)]
pub struct AudioLevels {
    #[validate(range(min = 0.0, max = 1.0))]
    pub narration_volume: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub background_volume: f64,
    pub mix_duration: MixDuration,
}

impl Default for AudioLevels {
    fn default() -> Self {
        Self {
            narration_volume: DEFAULT_NARRATION_VOLUME,
            background_volume: DEFAULT_BACKGROUND_VOLUME,
            mix_duration: MixDuration::default(),
        }
    }
}

// =============================================================================
// Batch-wide settings
// =============================================================================

/// Settings shared by every product in a batch.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct RenderSettings {
    /// Directory receiving `{product_id}.{container}` outputs; the worker's
    /// configured root is used when left empty
    #[serde(default)]
    pub output_root: PathBuf,
    /// Brand name; decides the logo anchor side
    #[serde(default)]
    pub brand: String,
    /// Outro clip appended to every product (first 3 seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outro_clip: Option<PathBuf>,
    #[serde(default = "default_logo_scale")]
    #[validate(range(min = 1, max = 100))]
    pub logo_scale_percent: u32,
    #[serde(default = "default_logo_offset")]
    pub logo_x: i32,
    #[serde(default = "default_logo_offset")]
    pub logo_y: i32,
    #[serde(default)]
    #[validate(nested)]
    pub subtitle: SubtitleStyle,
    #[serde(default)]
    #[validate(nested)]
    pub audio: AudioLevels,
    #[serde(default)]
    pub encoding: EncodingConfig,
    /// Apply the trim-and-speed treatment to the first media slot
    #[serde(default = "default_cut_hero_clip")]
    pub cut_hero_clip: bool,
}

fn default_logo_scale() -> u32 {
    DEFAULT_LOGO_SCALE_PERCENT
}
fn default_logo_offset() -> i32 {
    DEFAULT_LOGO_OFFSET
}
fn default_cut_hero_clip() -> bool {
    true
}

impl RenderSettings {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            brand: String::new(),
            outro_clip: None,
            logo_scale_percent: DEFAULT_LOGO_SCALE_PERCENT,
            logo_x: DEFAULT_LOGO_OFFSET,
            logo_y: DEFAULT_LOGO_OFFSET,
            subtitle: SubtitleStyle::default(),
            audio: AudioLevels::default(),
            encoding: EncodingConfig::default(),
            cut_hero_clip: true,
        }
    }

    /// Logo placement derived from the brand and offsets.
    pub fn logo_placement(&self) -> LogoPlacement {
        LogoPlacement {
            scale_percent: self.logo_scale_percent,
            x: self.logo_x,
            y: self.logo_y,
            anchor: AnchorSide::for_brand(&self.brand),
        }
    }
}
