//! Batch manifest: the per-product rows handed over by the job source
//! (spreadsheet export, dashboard) plus the settings shared by the batch.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

use crate::product::{Canvas, ProductId, ProductRenderJob};
use crate::settings::RenderSettings;

/// Default narration speaking rate used to size scripts.
pub const DEFAULT_WORDS_PER_MINUTE: u32 = 160;

/// One product row.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProductRow {
    pub product_id: ProductId,
    /// Ordered media files; blank entries are skipped
    #[serde(default)]
    pub media: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narration: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Speaking rate override for this product
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words_per_minute: Option<u32>,
}

fn non_blank(path: &Option<PathBuf>) -> Option<PathBuf> {
    path.as_ref()
        .filter(|p| !p.as_os_str().is_empty())
        .cloned()
}

impl ProductRow {
    /// Media paths with blank entries removed.
    pub fn media_paths(&self) -> Vec<PathBuf> {
        self.media
            .iter()
            .filter(|p| !p.as_os_str().is_empty())
            .cloned()
            .collect()
    }

    pub fn words_per_minute(&self) -> u32 {
        self.words_per_minute.unwrap_or(DEFAULT_WORDS_PER_MINUTE)
    }

    /// Build the self-contained render job for this row.
    pub fn to_job(&self, settings: &RenderSettings) -> ProductRenderJob {
        ProductRenderJob {
            product_id: self.product_id.clone(),
            media: self.media_paths(),
            narration_audio: non_blank(&self.narration),
            background_audio: non_blank(&self.background),
            logo: non_blank(&self.logo),
            outro_clip: non_blank(&settings.outro_clip),
            subtitle_text: self
                .subtitle
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            canvas: Canvas::FULL_HD,
            logo_placement: settings.logo_placement(),
            subtitle_style: settings.subtitle.clone(),
            audio: settings.audio.clone(),
            encoding: settings.encoding.clone(),
            cut_hero_clip: settings.cut_hero_clip,
            output_root: settings.output_root.clone(),
        }
    }
}

/// A batch of products sharing one set of render settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct BatchManifest {
    #[validate(nested)]
    pub settings: RenderSettings,
    #[serde(default)]
    pub products: Vec<ProductRow>,
}

impl BatchManifest {
    /// Render jobs for every product, in manifest order.
    pub fn jobs(&self) -> Vec<ProductRenderJob> {
        self.products
            .iter()
            .map(|row| row.to_job(&self.settings))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AnchorSide;

    const MANIFEST: &str = r#"{
        "settings": {
            "output_root": "/renders",
            "brand": "BlueStars",
            "outro_clip": "/assets/outro.mp4",
            "cut_hero_clip": false
        },
        "products": [
            {
                "product_id": "B01",
                "media": ["/m/1.mp4", "", "/m/2.jpg"],
                "logo": "",
                "narration": "/voice/B01.wav",
                "subtitle": "  3406107 Dryer Door Switch "
            },
            { "product_id": "B02", "media": ["/m/3.mp4"], "words_per_minute": 150 }
        ]
    }"#;

    #[test]
    fn test_manifest_to_jobs() {
        let manifest: BatchManifest = serde_json::from_str(MANIFEST).unwrap();
        let jobs = manifest.jobs();
        assert_eq!(jobs.len(), 2);

        let first = &jobs[0];
        assert_eq!(first.media.len(), 2);
        assert_eq!(first.logo, None);
        assert_eq!(first.narration_audio, Some(PathBuf::from("/voice/B01.wav")));
        assert_eq!(first.outro_clip, Some(PathBuf::from("/assets/outro.mp4")));
        assert_eq!(first.subtitle_text.as_deref(), Some("3406107 Dryer Door Switch"));
        assert_eq!(first.logo_placement.anchor, AnchorSide::Right);
        assert!(!first.cut_hero_clip);
        assert_eq!(first.output_path(), PathBuf::from("/renders/B01.mp4"));
    }

    #[test]
    fn test_words_per_minute_default() {
        let manifest: BatchManifest = serde_json::from_str(MANIFEST).unwrap();
        assert_eq!(manifest.products[0].words_per_minute(), DEFAULT_WORDS_PER_MINUTE);
        assert_eq!(manifest.products[1].words_per_minute(), 150);
    }
}
