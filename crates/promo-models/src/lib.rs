//! Shared data models for promo video rendering.
//!
//! This crate provides Serde-serializable types for:
//! - Per-product render jobs and the media items they reference
//! - Batch manifests and batch-wide render settings
//! - Encoding configuration
//! - Render results and batch reports

pub mod encoding;
pub mod manifest;
pub mod media;
pub mod product;
pub mod result;
pub mod settings;

// Re-export common types
pub use encoding::EncodingConfig;
pub use manifest::{BatchManifest, ProductRow};
pub use media::{MediaItem, MediaKind, STILL_IMAGE_SECONDS};
pub use product::{Canvas, ProductId, ProductRenderJob};
pub use result::{BatchReport, RenderOutcome, RenderResult};
pub use settings::{
    AnchorSide, AudioLevels, LogoPlacement, MixDuration, RenderSettings, SubtitleAlign,
    SubtitleStyle,
};
