//! Batch manifest loading.

use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};
use validator::Validate;

use promo_media::discover_font;
use promo_models::{BatchManifest, ProductId};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// Read, validate and complete a manifest file.
pub async fn load_manifest(path: impl AsRef<Path>, config: &WorkerConfig) -> WorkerResult<BatchManifest> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| WorkerError::invalid_manifest(path, e.to_string()))?;
    parse_manifest(&text, path, config)
}

/// Parse manifest JSON and fill in worker-level defaults.
///
/// The output root falls back to the configured one and the subtitle font is
/// resolved once here, so every job carries the same concrete font file.
pub fn parse_manifest(text: &str, path: &Path, config: &WorkerConfig) -> WorkerResult<BatchManifest> {
    let mut manifest: BatchManifest =
        serde_json::from_str(text).map_err(|e| WorkerError::invalid_manifest(path, e.to_string()))?;

    manifest
        .validate()
        .map_err(|e| WorkerError::invalid_manifest(path, e.to_string()))?;

    for row in &mut manifest.products {
        row.product_id = ProductId::new(row.product_id.as_str());
    }

    let mut seen = HashSet::new();
    for row in &manifest.products {
        if row.product_id.as_str().is_empty() {
            return Err(WorkerError::invalid_manifest(path, "product with empty product_id"));
        }
        if !seen.insert(row.product_id.as_str()) {
            return Err(WorkerError::invalid_manifest(
                path,
                format!("duplicate product_id {}", row.product_id),
            ));
        }
    }

    let settings = &mut manifest.settings;
    if settings.output_root.as_os_str().is_empty() {
        settings.output_root = config.output_root.clone();
    }

    let requested = settings
        .subtitle
        .font_file
        .clone()
        .or_else(|| config.subtitle_font.clone());
    settings.subtitle.font_file = discover_font(requested.as_deref());
    match &settings.subtitle.font_file {
        Some(font) => info!(font = %font.display(), "Subtitle font selected"),
        None => warn!("No subtitle font found, drawtext will use the fontconfig default"),
    }

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config() -> WorkerConfig {
        WorkerConfig {
            output_root: PathBuf::from("/tmp/promo-out"),
            ..WorkerConfig::default()
        }
    }

    #[test]
    fn test_output_root_defaults_to_config() {
        let text = r#"{ "settings": {}, "products": [ { "product_id": "A", "media": ["a.mp4"] } ] }"#;
        let manifest = parse_manifest(text, Path::new("m.json"), &config()).unwrap();
        assert_eq!(manifest.settings.output_root, PathBuf::from("/tmp/promo-out"));
        assert_eq!(manifest.jobs()[0].output_root, PathBuf::from("/tmp/promo-out"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let text = r#"{ "settings": {}, "products": [
            { "product_id": "A", "media": ["a.mp4"] },
            { "product_id": " A ", "media": ["b.mp4"] }
        ] }"#;
        let err = parse_manifest(text, Path::new("m.json"), &config()).unwrap_err();
        assert!(err.to_string().contains("duplicate product_id A"));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let text = r#"{ "settings": { "audio": { "narration_volume": 3.0, "background_volume": 0.1 } } }"#;
        assert!(matches!(
            parse_manifest(text, Path::new("m.json"), &config()),
            Err(WorkerError::InvalidManifest { .. })
        ));

        let garbage = parse_manifest("not json", Path::new("m.json"), &config());
        assert!(matches!(garbage, Err(WorkerError::InvalidManifest { .. })));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = load_manifest("/nonexistent/manifest.json", &config()).await.unwrap_err();
        assert!(matches!(err, WorkerError::InvalidManifest { .. }));
    }
}
