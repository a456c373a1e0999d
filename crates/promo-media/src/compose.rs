//! Composition of a product render into inputs and a filter graph.
//!
//! Input order is fixed: media slots, then outro, logo, narration and
//! background audio, each optional asset only when its file exists.

use std::path::Path;
use tracing::debug;

use promo_models::{AnchorSide, EncodingConfig, MediaItem, ProductRenderJob, STILL_IMAGE_SECONDS};

use crate::command::{FfmpegCommand, FfmpegInput};
use crate::error::{MediaError, MediaResult};
use crate::graph::{DrawText, Filter, FilterGraph, InputRegistry, InputRole, Label, Pad, PtsExpr};
use crate::timing::{ClipTiming, TimingPolicy};

/// Inputs and graph for one product render.
#[derive(Debug, Clone)]
pub struct RenderPlan {
    pub inputs: InputRegistry,
    pub graph: FilterGraph,
    /// Terminal video label
    pub video_out: Label,
    /// Terminal audio label, when any audio input exists
    pub audio_out: Option<Label>,
    /// Timing applied to each media slot
    pub clip_timings: Vec<ClipTiming>,
}

impl RenderPlan {
    /// Full ffmpeg command writing the plan to `output`.
    pub fn to_command(&self, encoding: &EncodingConfig, output: &Path) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(output);

        if let Some(hwaccel) = &encoding.hwaccel {
            cmd = cmd.global_arg("-hwaccel").global_arg(hwaccel);
        }

        for decl in self.inputs.decls() {
            cmd = cmd.input_spec(decl.input.clone());
        }

        cmd = cmd
            .filter_complex(self.graph.to_filter_complex())
            .map(self.video_out.bracketed());

        if let Some(audio) = &self.audio_out {
            cmd = cmd.map(audio.bracketed()).output_args(encoding.audio_args());
        }

        cmd.output_args(encoding.video_args())
    }
}

fn existing(path: Option<&Path>) -> Option<&Path> {
    path.filter(|p| p.exists())
}

/// Build the render plan for a job.
///
/// `items` are the job's media in slot order with their estimated durations,
/// `narration` is the already-trimmed narration track and `subtitle` the
/// fitted drawtext, if any.
pub fn build_plan(
    job: &ProductRenderJob,
    items: &[MediaItem],
    narration: Option<&Path>,
    subtitle: Option<DrawText>,
    policy: &TimingPolicy,
) -> MediaResult<RenderPlan> {
    if items.is_empty() {
        return Err(MediaError::invalid_job("no media items to compose"));
    }

    let canvas = job.canvas;
    let mut inputs = InputRegistry::new();
    let mut graph = FilterGraph::new();

    // Inputs
    let mut media_indices = Vec::with_capacity(items.len());
    for item in items {
        let input = if item.is_still() {
            FfmpegInput::with_args(
                &item.path,
                ["-loop".to_string(), "1".to_string(), "-t".to_string(), format!("{:.3}", STILL_IMAGE_SECONDS)],
            )
        } else {
            FfmpegInput::new(&item.path)
        };
        media_indices.push(inputs.register(InputRole::Media(item.slot_index), input)?);
    }

    let outro = existing(job.outro_clip.as_deref())
        .map(|p| {
            inputs.register(
                InputRole::Outro,
                FfmpegInput::with_args(p, ["-t".to_string(), format!("{}", policy.outro_secs)]),
            )
        })
        .transpose()?;
    let logo = existing(job.logo.as_deref())
        .map(|p| inputs.register(InputRole::Logo, FfmpegInput::new(p)))
        .transpose()?;
    let narration = existing(narration)
        .map(|p| inputs.register(InputRole::Narration, FfmpegInput::new(p)))
        .transpose()?;
    let background = existing(job.background_audio.as_deref())
        .map(|p| inputs.register(InputRole::Background, FfmpegInput::new(p)))
        .transpose()?;

    // Per-clip normalization
    let mut clip_timings = Vec::with_capacity(items.len());
    let mut clips = Vec::with_capacity(items.len());
    for (item, &index) in items.iter().zip(&media_indices) {
        let timing = policy.plan_clip(item, job.cut_hero_clip);

        let mut filters = vec![
            Filter::Scale {
                width: canvas.width as i32,
                height: canvas.height as i32,
            },
            Filter::SetSar,
        ];
        match timing {
            ClipTiming::Passthrough => {}
            ClipTiming::HeroCut { start, end, speed } => {
                filters.push(Filter::Trim { start, end });
                filters.push(Filter::SetPts(PtsExpr::ResetToZero));
                filters.push(Filter::SetPts(PtsExpr::Speed(speed)));
            }
            ClipTiming::Compress { speed } => {
                filters.push(Filter::SetPts(PtsExpr::Speed(speed)));
            }
        }

        debug!(slot = item.slot_index, ?timing, "Planned clip");
        clip_timings.push(timing);
        clips.push(graph.add(vec![Pad::video(index)], filters, &format!("v{}", item.slot_index)));
    }

    let mut video = graph.add(
        clips.iter().map(Pad::from).collect(),
        vec![Filter::Concat {
            segments: clips.len(),
            video: 1,
            audio: 0,
        }],
        "vbody",
    );

    if let Some(drawtext) = subtitle {
        video = graph.add(vec![Pad::from(&video)], vec![Filter::DrawText(drawtext)], "vsub");
    }

    if let Some(logo) = logo {
        let placement = &job.logo_placement;
        let scaled = graph.add(
            vec![Pad::video(logo)],
            vec![Filter::Scale {
                width: placement.width_for(canvas.width) as i32,
                height: -1,
            }],
            "logo_s",
        );
        let x = match placement.anchor {
            AnchorSide::Right => format!("W-w-{}", placement.x),
            AnchorSide::Left => placement.x.to_string(),
        };
        video = graph.add(
            vec![Pad::from(&video), Pad::from(&scaled)],
            vec![Filter::Overlay {
                x,
                y: placement.y.to_string(),
            }],
            "vlogo",
        );
    }

    if let Some(outro) = outro {
        let normalized = graph.add(
            vec![Pad::video(outro)],
            vec![
                Filter::Scale {
                    width: canvas.width as i32,
                    height: canvas.height as i32,
                },
                Filter::SetSar,
                Filter::Fps(job.encoding.frame_rate.clone()),
                Filter::SetPts(PtsExpr::ResetToZero),
            ],
            "outro_norm",
        );
        video = graph.add(
            vec![Pad::from(&video), Pad::from(&normalized)],
            vec![Filter::Concat {
                segments: 2,
                video: 1,
                audio: 0,
            }],
            "vfinal",
        );
    }

    // Audio
    let mut tracks = Vec::new();
    if let Some(index) = narration {
        tracks.push(graph.add(
            vec![Pad::audio(index)],
            vec![Filter::Volume(job.audio.narration_volume)],
            "anarr",
        ));
    }
    if let Some(index) = background {
        tracks.push(graph.add(
            vec![Pad::audio(index)],
            vec![Filter::Volume(job.audio.background_volume)],
            "abg",
        ));
    }

    let audio_out = if tracks.is_empty() {
        None
    } else {
        Some(graph.add(
            tracks.iter().map(Pad::from).collect(),
            vec![Filter::Amix {
                inputs: tracks.len(),
                duration: job.audio.mix_duration,
            }],
            "aout",
        ))
    };

    let mut terminals = vec![&video];
    if let Some(audio) = &audio_out {
        terminals.push(audio);
    }
    graph.check(inputs.len(), &terminals)?;

    Ok(RenderPlan {
        inputs,
        graph,
        video_out: video,
        audio_out,
        clip_timings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use promo_models::{MediaKind, ProductId};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"x").unwrap();
        path
    }

    fn items(dir: &TempDir) -> Vec<MediaItem> {
        vec![
            MediaItem::new(touch(dir, "hero.mp4"), MediaKind::Video, 20.0, 0),
            MediaItem::new(touch(dir, "demo.mp4"), MediaKind::Video, 40.0, 1),
            MediaItem::new(touch(dir, "still.jpg"), MediaKind::Image, 3.0, 2),
        ]
    }

    fn job(dir: &TempDir, media: &[MediaItem]) -> ProductRenderJob {
        let mut job = ProductRenderJob::new(
            ProductId::new("B0TEST"),
            media.iter().map(|i| i.path.clone()).collect(),
            dir.path(),
        );
        job.cut_hero_clip = true;
        job
    }

    #[test]
    fn test_all_assets_present() {
        let dir = TempDir::new().unwrap();
        let media = items(&dir);
        let mut job = job(&dir, &media);
        job.outro_clip = Some(touch(&dir, "outro.mp4"));
        job.logo = Some(touch(&dir, "logo.png"));
        job.background_audio = Some(touch(&dir, "music.mp3"));
        let narration = touch(&dir, "B0TEST_narration.wav");

        let plan = build_plan(&job, &media, Some(&narration), None, &TimingPolicy::default()).unwrap();

        assert_eq!(plan.inputs.len(), media.len() + 4);
        assert_eq!(
            plan.inputs.roles(),
            vec![
                InputRole::Media(0),
                InputRole::Media(1),
                InputRole::Media(2),
                InputRole::Outro,
                InputRole::Logo,
                InputRole::Narration,
                InputRole::Background,
            ]
        );
        assert_eq!(plan.video_out.as_str(), "vfinal");
        assert_eq!(plan.audio_out.as_ref().map(Label::as_str), Some("aout"));

        let fc = plan.graph.to_filter_complex();
        assert!(fc.contains("[0:v]scale=1920:1080,setsar=1,trim=start=5.500000:end=14.500000,setpts=PTS-STARTPTS,setpts=PTS/1.800000[v0]"));
        assert!(fc.contains("[v0][v1][v2]concat=n=3:v=1:a=0[vbody]"));
        assert!(fc.contains("[4:v]scale=288:-1[logo_s]"));
        assert!(fc.contains("[vbody][logo_s]overlay=50:50[vlogo]"));
        assert!(fc.contains("[vlogo][outro_norm]concat=n=2:v=1:a=0[vfinal]"));
        assert!(fc.contains("[5:a]volume=1[anarr]"));
        assert!(fc.contains("[6:a]volume=0.1[abg]"));
        assert!(fc.contains("[anarr][abg]amix=inputs=2:duration=shortest[aout]"));
    }

    #[test]
    fn test_no_optional_assets() {
        let dir = TempDir::new().unwrap();
        let media = items(&dir);
        let mut job = job(&dir, &media);
        // Declared but missing on disk
        job.logo = Some(dir.path().join("missing_logo.png"));
        job.outro_clip = Some(dir.path().join("missing_outro.mp4"));

        let plan = build_plan(&job, &media, None, None, &TimingPolicy::default()).unwrap();

        assert_eq!(plan.inputs.len(), media.len());
        assert_eq!(plan.video_out.as_str(), "vbody");
        assert!(plan.audio_out.is_none());
        assert!(!plan.graph.to_filter_complex().contains("amix"));

        let args = plan.to_command(&job.encoding, &job.output_path()).build_args();
        assert!(!args.iter().any(|a| a == "-c:a"));
        assert_eq!(args.iter().filter(|a| *a == "-map").count(), 1);
    }

    #[test]
    fn test_clip_timings_and_stills() {
        let dir = TempDir::new().unwrap();
        let media = items(&dir);
        let job = job(&dir, &media);

        let plan = build_plan(&job, &media, None, None, &TimingPolicy::default()).unwrap();
        assert!(matches!(plan.clip_timings[0], ClipTiming::HeroCut { .. }));
        assert!(matches!(plan.clip_timings[1], ClipTiming::Compress { .. }));
        assert_eq!(plan.clip_timings[2], ClipTiming::Passthrough);

        let still = &plan.inputs.decls()[2].input;
        assert_eq!(still.args, vec!["-loop", "1", "-t", "3.000"]);
    }

    #[test]
    fn test_right_anchored_logo_and_subtitle() {
        let dir = TempDir::new().unwrap();
        let media = items(&dir);
        let mut job = job(&dir, &media);
        job.logo = Some(touch(&dir, "logo.png"));
        job.logo_placement.anchor = AnchorSide::Right;

        let drawtext = crate::subtitle::SubtitleFitter::unmeasured().drawtext(
            "Door Switch",
            &job.subtitle_style,
            job.canvas,
        );
        let plan = build_plan(&job, &media, None, Some(drawtext), &TimingPolicy::default()).unwrap();
        let fc = plan.graph.to_filter_complex();

        assert!(fc.contains("[vbody]drawtext="));
        assert!(fc.contains("[vsub][logo_s]overlay=W-w-50:50[vlogo]"));
        assert_eq!(plan.video_out.as_str(), "vlogo");
    }

    #[test]
    fn test_command_layout() {
        let dir = TempDir::new().unwrap();
        let media = items(&dir);
        let mut job = job(&dir, &media);
        job.background_audio = Some(touch(&dir, "music.mp3"));

        let plan = build_plan(&job, &media, None, None, &TimingPolicy::default()).unwrap();
        let args = plan.to_command(&job.encoding, &job.output_path()).build_args();

        let pos = |s: &str| args.iter().position(|a| a == s).unwrap();
        assert!(pos("-hwaccel") < pos("-i"));
        assert!(pos("-filter_complex") < pos("-map"));
        assert!(pos("-c:a") < pos("-c:v"));
        assert_eq!(args[pos("-preset") + 1], "medium");
        assert_eq!(args.last().unwrap(), &job.output_path().to_string_lossy().to_string());
        assert!(fc_has_single_audio(&plan));
    }

    fn fc_has_single_audio(plan: &RenderPlan) -> bool {
        plan.graph
            .to_filter_complex()
            .contains("[abg]amix=inputs=1:duration=shortest[aout]")
    }

    #[test]
    fn test_empty_media_rejected() {
        let dir = TempDir::new().unwrap();
        let job = ProductRenderJob::new(ProductId::new("X"), vec![], dir.path());
        assert!(build_plan(&job, &[], None, None, &TimingPolicy::default()).is_err());
    }
}
