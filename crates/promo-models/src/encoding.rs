//! Video encoding configuration.
//!
//! Rate control supplies both a CRF and explicit bitrate bounds at the same
//! time. Which one governs is left to the encoder's own precedence rules
//! (libx264 and NVENC resolve it differently); operators who need one strategy
//! only should clear the other through `extra_args` or by tuning the values.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264 software)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 18;
pub const DEFAULT_VIDEO_BITRATE: &str = "5M";
pub const DEFAULT_MIN_RATE: &str = "4.5M";
pub const DEFAULT_MAX_RATE: &str = "12M";
pub const DEFAULT_BUFSIZE: &str = "20M";
/// Output frame rate
pub const DEFAULT_FRAME_RATE: &str = "29.97";
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";
/// Color standard pinned on every output
pub const DEFAULT_COLOR_STANDARD: &str = "bt709";
pub const DEFAULT_COLOR_RANGE: &str = "tv";

/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "197k";
pub const DEFAULT_AUDIO_SAMPLE_RATE: u32 = 48_000;
pub const DEFAULT_AUDIO_CHANNELS: u8 = 2;

/// Output container extension
pub const DEFAULT_CONTAINER: &str = "mp4";

/// Encoder name fragments that identify hardware encoders.
const HARDWARE_MARKERS: &[&str] = &["nvenc", "qsv", "amf", "vaapi", "_mf"];

/// Video encoding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264", "h264_nvenc")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset; derived from the codec when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Target video bitrate
    #[serde(default = "default_video_bitrate")]
    pub video_bitrate: String,

    #[serde(default = "default_min_rate")]
    pub min_rate: String,

    #[serde(default = "default_max_rate")]
    pub max_rate: String,

    /// Rate-control buffer size
    #[serde(default = "default_bufsize")]
    pub bufsize: String,

    #[serde(default = "default_frame_rate")]
    pub frame_rate: String,

    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    /// Colorspace, primaries and transfer characteristics
    #[serde(default = "default_color_standard")]
    pub color_standard: String,

    #[serde(default = "default_color_range")]
    pub color_range: String,

    /// Input hardware acceleration (`-hwaccel`), omitted when unset
    #[serde(default = "default_hwaccel", skip_serializing_if = "Option::is_none")]
    pub hwaccel: Option<String>,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    #[serde(default = "default_audio_sample_rate")]
    pub audio_sample_rate: u32,

    #[serde(default = "default_audio_channels")]
    pub audio_channels: u8,

    /// Output container extension
    #[serde(default = "default_container")]
    pub container: String,

    /// Additional FFmpeg output arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_video_bitrate() -> String {
    DEFAULT_VIDEO_BITRATE.to_string()
}
fn default_min_rate() -> String {
    DEFAULT_MIN_RATE.to_string()
}
fn default_max_rate() -> String {
    DEFAULT_MAX_RATE.to_string()
}
fn default_bufsize() -> String {
    DEFAULT_BUFSIZE.to_string()
}
fn default_frame_rate() -> String {
    DEFAULT_FRAME_RATE.to_string()
}
fn default_pixel_format() -> String {
    DEFAULT_PIXEL_FORMAT.to_string()
}
fn default_color_standard() -> String {
    DEFAULT_COLOR_STANDARD.to_string()
}
fn default_color_range() -> String {
    DEFAULT_COLOR_RANGE.to_string()
}
fn default_hwaccel() -> Option<String> {
    Some("auto".to_string())
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}
fn default_audio_sample_rate() -> u32 {
    DEFAULT_AUDIO_SAMPLE_RATE
}
fn default_audio_channels() -> u8 {
    DEFAULT_AUDIO_CHANNELS
}
fn default_container() -> String {
    DEFAULT_CONTAINER.to_string()
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: default_video_codec(),
            preset: None,
            crf: DEFAULT_CRF,
            video_bitrate: default_video_bitrate(),
            min_rate: default_min_rate(),
            max_rate: default_max_rate(),
            bufsize: default_bufsize(),
            frame_rate: default_frame_rate(),
            pixel_format: default_pixel_format(),
            color_standard: default_color_standard(),
            color_range: default_color_range(),
            hwaccel: default_hwaccel(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            audio_sample_rate: DEFAULT_AUDIO_SAMPLE_RATE,
            audio_channels: DEFAULT_AUDIO_CHANNELS,
            container: default_container(),
            extra_args: Vec::new(),
        }
    }
}

impl EncodingConfig {
    /// Create a new encoding configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new config using another video codec.
    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    /// Whether the codec is an NVIDIA NVENC encoder.
    pub fn is_nvenc(&self) -> bool {
        self.codec.contains("nvenc")
    }

    /// Whether the codec runs on dedicated encoder hardware.
    pub fn is_hardware(&self) -> bool {
        HARDWARE_MARKERS.iter().any(|m| self.codec.contains(m))
    }

    /// Preset passed to the encoder.
    pub fn effective_preset(&self) -> &str {
        match &self.preset {
            Some(preset) => preset,
            None if self.is_nvenc() => "p5",
            None => "medium",
        }
    }

    /// Audio encoder arguments (only emitted when the output has audio).
    pub fn audio_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
            "-ar".to_string(),
            self.audio_sample_rate.to_string(),
            "-ac".to_string(),
            self.audio_channels.to_string(),
        ];

        if self.audio_codec == "aac" {
            args.extend(
                ["-aac_coder", "twoloop", "-profile:a", "aac_low"]
                    .iter()
                    .map(|s| s.to_string()),
            );
        }

        args
    }

    /// Video encoder, rate control, color and container arguments.
    pub fn video_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-b:v".to_string(),
            self.video_bitrate.clone(),
            "-minrate".to_string(),
            self.min_rate.clone(),
            "-maxrate".to_string(),
            self.max_rate.clone(),
            "-bufsize".to_string(),
            self.bufsize.clone(),
            "-r".to_string(),
            self.frame_rate.clone(),
            "-preset".to_string(),
            self.effective_preset().to_string(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
            "-colorspace".to_string(),
            self.color_standard.clone(),
            "-color_primaries".to_string(),
            self.color_standard.clone(),
            "-color_trc".to_string(),
            self.color_standard.clone(),
            "-color_range".to_string(),
            self.color_range.clone(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-shortest".to_string(),
        ];

        args.extend(self.extra_args.clone());

        args
    }

    /// Convert to FFmpeg output arguments.
    pub fn to_ffmpeg_args(&self, with_audio: bool) -> Vec<String> {
        let mut args = Vec::new();
        if with_audio {
            args.extend(self.audio_args());
        }
        args.extend(self.video_args());
        args
    }
}
