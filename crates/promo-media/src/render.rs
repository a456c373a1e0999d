//! Per-product render pipeline.
//!
//! `render_product` never returns an error: every failure is folded into a
//! `RenderResult` so a batch can keep going.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use validator::Validate;

use promo_models::{MediaItem, MediaKind, ProductRenderJob, RenderResult};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::compose::build_plan;
use crate::duration::estimate_item;
use crate::error::{MediaError, MediaResult};
use crate::subtitle::SubtitleFitter;
use crate::timing::TimingPolicy;

/// Process-level render settings that are not part of the job.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub timing: TimingPolicy,
    /// Per-ffmpeg-invocation timeout
    pub timeout_secs: Option<u64>,
    /// ffmpeg program name or path
    pub ffmpeg: String,
    /// Budget for the whole job, every ffmpeg call included
    pub deadline: Option<Duration>,
    /// Run ffmpeg in a process group of its own
    pub own_process_group: bool,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            timing: TimingPolicy::default(),
            timeout_secs: None,
            ffmpeg: "ffmpeg".to_string(),
            deadline: None,
            own_process_group: true,
        }
    }
}

impl RenderContext {
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Keep ffmpeg in this process's group, as a render worker child does.
    pub fn in_worker_group(mut self) -> Self {
        self.own_process_group = false;
        self
    }

    fn runner(&self) -> FfmpegRunner {
        let mut runner = FfmpegRunner::new().with_program(&self.ffmpeg);
        if let Some(secs) = self.timeout_secs {
            runner = runner.with_timeout(secs);
        }
        if !self.own_process_group {
            runner = runner.in_caller_group();
        }
        runner
    }
}

/// Render one product to `{output_root}/{product_id}.{container}`.
pub async fn render_product(job: &ProductRenderJob, ctx: &RenderContext) -> RenderResult {
    let started = Instant::now();
    info!(product_id = %job.product_id, media = job.media.len(), "Rendering product");

    let outcome = match ctx.deadline {
        Some(deadline) => match tokio::time::timeout(deadline, try_render(job, ctx)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                // The in-flight ffmpeg was killed when its future was dropped
                remove_partial_output(&job.output_path()).await;
                Err(MediaError::Timeout(deadline.as_secs()))
            }
        },
        None => try_render(job, ctx).await,
    };

    let result = match outcome {
        Ok(output) => {
            info!(product_id = %job.product_id, output = %output.display(), "Render complete");
            RenderResult::success(job.product_id.clone(), output)
        }
        Err(e) => {
            warn!(product_id = %job.product_id, "Render failed: {}", e);
            RenderResult::failure(
                job.product_id.clone(),
                e.to_string(),
                e.diagnostics().map(str::to_string),
            )
        }
    };

    result.with_elapsed_ms(started.elapsed().as_millis() as u64)
}

async fn try_render(job: &ProductRenderJob, ctx: &RenderContext) -> MediaResult<PathBuf> {
    job.validate()?;

    if let Some(missing) = job.media.iter().find(|p| !p.exists()) {
        return Err(MediaError::FileNotFound(missing.clone()));
    }

    tokio::fs::create_dir_all(&job.output_root).await?;

    let runner = ctx.runner();
    let items = media_items(&job.media).await;
    let body = ctx.timing.body_duration(&items, job.cut_hero_clip);

    let narration = match job.narration_audio.as_deref().filter(|p| p.exists()) {
        Some(source) => {
            let seconds = ctx.timing.narration_trim(body);
            if seconds > 0.0 {
                let dest = job.narration_trim_path();
                trim_narration(&runner, source, seconds, &dest).await?;
                Some(dest)
            } else {
                warn!(product_id = %job.product_id, body, "No room for narration, omitting it");
                None
            }
        }
        None => None,
    };

    let subtitle = job.subtitle().map(|text| {
        SubtitleFitter::for_style(&job.subtitle_style).drawtext(text, &job.subtitle_style, job.canvas)
    });

    let plan = build_plan(job, &items, narration.as_deref(), subtitle, &ctx.timing)?;
    let output = job.output_path();

    info!(
        product_id = %job.product_id,
        inputs = plan.inputs.len(),
        body_secs = body,
        has_audio = plan.audio_out.is_some(),
        "Running composition"
    );
    if let Err(e) = runner.run(&plan.to_command(&job.encoding, &output)).await {
        remove_partial_output(&output).await;
        return Err(e);
    }

    if let Some(path) = narration {
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), "Failed to remove trimmed narration: {}", e);
        }
    }

    Ok(output)
}

/// Delete whatever a failed or killed ffmpeg left at `output`.
pub async fn remove_partial_output(output: &Path) {
    match tokio::fs::remove_file(output).await {
        Ok(()) => debug!(output = %output.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(output = %output.display(), "Failed to remove partial output: {}", e),
    }
}

/// Media items in slot order with their estimated durations.
///
/// Unrecognized extensions are treated as video.
pub async fn media_items(paths: &[PathBuf]) -> Vec<MediaItem> {
    let mut items = Vec::with_capacity(paths.len());
    for (slot, path) in paths.iter().enumerate() {
        let kind = MediaKind::from_path(path).unwrap_or(MediaKind::Video);
        let seconds = estimate_item(path).await.estimate.seconds();
        items.push(MediaItem::new(path.clone(), kind, seconds, slot));
    }
    items
}

/// Cut the narration track to `seconds`.
pub async fn trim_narration(
    runner: &FfmpegRunner,
    source: &Path,
    seconds: f64,
    dest: &Path,
) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(dest).input(source).duration(seconds);
    runner.run(&cmd).await?;
    Ok(())
}
