#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper and promo video composition engine.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a runner with timeouts
//! - FFprobe duration probing and per-product duration estimates
//! - Timing rules for the hero and demo clip slots
//! - A typed filter-graph builder serialized to `-filter_complex`
//! - Subtitle fitting against real font metrics
//! - The per-product render pipeline

pub mod command;
pub mod compose;
pub mod duration;
pub mod encoders;
pub mod error;
pub mod fonts;
pub mod graph;
pub mod probe;
pub mod render;
pub mod subtitle;
pub mod timing;

pub use command::{
    check_ffmpeg, check_ffprobe, kill_process_group, FfmpegCommand, FfmpegInput, FfmpegRunner,
};
pub use compose::{build_plan, RenderPlan};
pub use duration::{
    check_narration_fit, estimate_durations, estimate_item, estimate_product, estimate_products,
    target_word_count, DurationEstimate, NarrationFit, ProductDuration,
};
pub use encoders::{detect_encoders, preferred_encoder};
pub use error::{MediaError, MediaResult};
pub use fonts::discover_font;
pub use graph::{FilterGraph, InputRegistry, InputRole, Label};
pub use probe::{probe_duration, ProbeOutcome};
pub use render::{media_items, remove_partial_output, render_product, RenderContext};
pub use subtitle::{FontMetrics, SubtitleFitter, TextMeasure};
pub use timing::{ClipTiming, TimingPolicy};
