use std::path::Path;

use promo_media::{check_ffmpeg, check_ffprobe, discover_font, FontMetrics};
use promo_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "worker-selfcheck: starting with output_root={}",
        config.output_root.display()
    );
    ensure_output_root(&config.output_root).await?;
    ensure_tools()?;
    ensure_font(config.subtitle_font.as_deref())?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_output_root(path: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(path).await?;

    let probe = path.join(".selfcheck");
    tokio::fs::write(&probe, b"ok")
        .await
        .map_err(|e| anyhow::anyhow!("output root {} is not writable: {}", path.display(), e))?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}

fn ensure_tools() -> anyhow::Result<()> {
    let ffmpeg = check_ffmpeg()?;
    let ffprobe = check_ffprobe()?;
    println!("worker-selfcheck: ffmpeg={}", ffmpeg.display());
    println!("worker-selfcheck: ffprobe={}", ffprobe.display());
    Ok(())
}

fn ensure_font(configured: Option<&Path>) -> anyhow::Result<()> {
    match discover_font(configured) {
        Some(font) => {
            FontMetrics::load(&font)?;
            println!("worker-selfcheck: subtitle font={}", font.display());
        }
        None => println!("worker-selfcheck: no subtitle font found, drawtext will use fontconfig"),
    }
    Ok(())
}
