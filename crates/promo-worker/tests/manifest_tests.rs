//! Manifest loading integration tests.

use std::path::PathBuf;

use promo_models::AnchorSide;
use promo_worker::{load_manifest, WorkerConfig, WorkerError};

fn write_manifest(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("manifest.json");
    std::fs::write(&path, body).unwrap();
    path
}

#[tokio::test]
async fn test_manifest_to_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let font = dir.path().join("Bold.ttf");
    std::fs::write(&font, b"stub").unwrap();

    let body = format!(
        r##"{{
            "settings": {{
                "output_root": "{out}",
                "brand": "BlueStars",
                "outro_clip": "/assets/outro.mp4",
                "subtitle": {{
                    "align": "right",
                    "y": 120,
                    "font_size": 90,
                    "min_font_size": 40,
                    "font_color": "#FFFFFF",
                    "border_width": 3,
                    "border_color": "#000000",
                    "margin": 80,
                    "font_file": "{font}"
                }},
                "encoding": {{ "codec": "h264_nvenc" }}
            }},
            "products": [
                {{ "product_id": "B01", "media": ["/m/1.mp4", "/m/2.jpg"], "subtitle": "Door Switch" }},
                {{ "product_id": "B02", "media": ["/m/3.mp4"], "narration": "/v/B02.wav" }}
            ]
        }}"##,
        out = dir.path().join("out").display(),
        font = font.display()
    );
    let path = write_manifest(&dir, &body);

    let manifest = load_manifest(&path, &WorkerConfig::default()).await.unwrap();
    let jobs = manifest.jobs();

    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].product_id.as_str(), "B01");
    assert_eq!(jobs[0].output_path(), dir.path().join("out").join("B01.mp4"));
    assert_eq!(jobs[0].logo_placement.anchor, AnchorSide::Right);
    assert_eq!(jobs[0].subtitle_style.font_file.as_ref(), Some(&font));
    assert_eq!(jobs[0].subtitle_style.font_size, 90);
    assert_eq!(jobs[0].encoding.effective_preset(), "p5");
    assert_eq!(jobs[1].narration_audio, Some(PathBuf::from("/v/B02.wav")));
    assert!(jobs.iter().all(|j| j.cut_hero_clip));
}

#[tokio::test]
async fn test_min_font_above_start_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_manifest(
        &dir,
        r##"{
            "settings": {
                "subtitle": {
                    "y": 100, "font_size": 30, "min_font_size": 60,
                    "font_color": "#000000", "border_width": 2,
                    "border_color": "#FFFFFF", "margin": 100
                }
            },
            "products": []
        }"##,
    );

    let err = load_manifest(&path, &WorkerConfig::default()).await.unwrap_err();
    assert!(matches!(err, WorkerError::InvalidManifest { .. }));
}
