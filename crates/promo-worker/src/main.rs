//! Promo video batch worker binary.

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use promo_media::{
    check_narration_fit, detect_encoders, estimate_products, preferred_encoder, probe_duration,
    render_product, target_word_count, NarrationFit, RenderContext,
};
use promo_models::{BatchManifest, ProductRenderJob};
use promo_worker::{
    init_tracing, load_manifest, BatchOrchestrator, InProcessLauncher, JobLauncher, ProcessLauncher,
    WorkerConfig,
};

/// Batch renderer for product promo videos
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render every product of a manifest
    Render {
        #[arg(short, long)]
        manifest: PathBuf,
        /// Write the batch report as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,
        /// Render in this process instead of worker children
        #[arg(long)]
        in_process: bool,
        /// Override PROMO_MAX_RENDERS
        #[arg(long)]
        max_renders: Option<usize>,
    },
    /// Render one job read as JSON from stdin; prints the result JSON
    #[command(hide = true)]
    RenderJob {
        /// Give up on the whole job after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,
    },
    /// Estimate video durations and narration word counts
    Estimate {
        #[arg(short, long)]
        manifest: PathBuf,
    },
    /// Compare synthesized narration length against the estimated video length
    VoiceCheck {
        #[arg(short, long)]
        manifest: PathBuf,
    },
    /// List usable video encoders
    Encoders {
        #[arg(long, default_value = "ffmpeg")]
        ffmpeg: String,
    },
    /// Print the manifest JSON schema
    ManifestSchema,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = WorkerConfig::from_env();

    match cli.command {
        Commands::Render {
            manifest,
            report,
            in_process,
            max_renders,
        } => {
            let failed = render(&config, &manifest, report, in_process, max_renders).await?;
            if failed > 0 {
                std::process::exit(2);
            }
        }
        Commands::RenderJob { deadline_secs } => render_job(&config, deadline_secs).await?,
        Commands::Estimate { manifest } => estimate(&config, &manifest).await?,
        Commands::VoiceCheck { manifest } => voice_check(&config, &manifest).await?,
        Commands::Encoders { ffmpeg } => {
            let encoders = detect_encoders(&ffmpeg).await?;
            for encoder in &encoders {
                println!("{}", encoder);
            }
            println!("preferred: {}", preferred_encoder(&encoders));
        }
        Commands::ManifestSchema => {
            let schema = schemars::schema_for!(BatchManifest);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }

    Ok(())
}

async fn render(
    config: &WorkerConfig,
    manifest_path: &Path,
    report_path: Option<PathBuf>,
    in_process: bool,
    max_renders: Option<usize>,
) -> anyhow::Result<usize> {
    let manifest = load_manifest(manifest_path, config).await?;
    let jobs = manifest.jobs();
    info!(products = jobs.len(), manifest = %manifest_path.display(), "Loaded manifest");

    let launcher: Arc<dyn JobLauncher> = if in_process || config.in_process {
        Arc::new(InProcessLauncher::from_config(config))
    } else {
        Arc::new(ProcessLauncher::from_config(config)?)
    };
    let orchestrator =
        BatchOrchestrator::new(launcher, max_renders.unwrap_or(config.max_concurrent_renders));

    let report = orchestrator.run(jobs).await;
    for line in &report.logs {
        println!("{}", line);
    }
    println!(
        "{} rendered, {} failed",
        report.succeeded(),
        report.failed()
    );

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("writing report to {}", path.display()))?;
    }

    Ok(report.failed())
}

/// Worker child mode: job JSON on stdin, `RenderResult` JSON on stdout.
async fn render_job(config: &WorkerConfig, deadline_secs: Option<u64>) -> anyhow::Result<()> {
    let mut input = String::new();
    tokio::io::stdin().read_to_string(&mut input).await?;
    let job: ProductRenderJob = serde_json::from_str(&input).context("parsing render job")?;

    let mut ctx = RenderContext::default()
        .with_timeout(config.render_timeout.as_secs())
        .in_worker_group();
    if let Some(secs) = deadline_secs {
        ctx = ctx.with_deadline(Duration::from_secs(secs));
    }
    let result = render_product(&job, &ctx).await;

    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

async fn estimate(config: &WorkerConfig, manifest_path: &Path) -> anyhow::Result<()> {
    let manifest = load_manifest(manifest_path, config).await?;
    let products = manifest
        .products
        .iter()
        .map(|row| (row.product_id.clone(), row.media_paths()))
        .collect();
    let estimates = estimate_products(products, config.max_parallel_probes).await;

    for (row, (product_id, duration)) in manifest.products.iter().zip(&estimates) {
        let wpm = row.words_per_minute();
        println!(
            "{}: {} -> {} words at {} wpm",
            product_id,
            duration.log_line(),
            target_word_count(duration.total(), wpm),
            wpm
        );
    }
    Ok(())
}

async fn voice_check(config: &WorkerConfig, manifest_path: &Path) -> anyhow::Result<()> {
    let manifest = load_manifest(manifest_path, config).await?;
    let products = manifest
        .products
        .iter()
        .map(|row| (row.product_id.clone(), row.media_paths()))
        .collect();
    let estimates = estimate_products(products, config.max_parallel_probes).await;

    let narrations: Vec<Option<f64>> = stream::iter(manifest.products.iter().map(|row| {
        let narration = row.narration.clone().filter(|p| !p.as_os_str().is_empty());
        async move {
            match narration {
                Some(path) => Some(probe_duration(&path).await.seconds()),
                None => None,
            }
        }
    }))
    .buffered(config.max_parallel_probes.max(1))
    .collect()
    .await;

    for ((row, (product_id, video)), narration) in
        manifest.products.iter().zip(&estimates).zip(narrations)
    {
        let Some(narration) = narration else {
            println!("{}: no narration", product_id);
            continue;
        };

        match check_narration_fit(narration, video.total(), row.words_per_minute()) {
            NarrationFit::Fits { ratio } => println!(
                "{}: OK narration {:.2}s / video {:.2}s ({:.0}%)",
                product_id,
                narration,
                video.total(),
                ratio * 100.0
            ),
            NarrationFit::TooLong {
                ratio,
                recommended_wpm,
            } => {
                warn!(product_id = %product_id, ratio, "Narration too long");
                println!(
                    "{}: TOO LONG narration {:.2}s / video {:.2}s ({:.0}%), regenerate at {} wpm",
                    product_id,
                    narration,
                    video.total(),
                    ratio * 100.0,
                    recommended_wpm
                );
            }
            NarrationFit::Unknown => println!("{}: duration unknown", product_id),
        }
    }
    Ok(())
}
