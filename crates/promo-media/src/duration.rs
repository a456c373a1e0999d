//! Duration estimation for product media.
//!
//! Estimates feed two upstream decisions: how many words the narration
//! script should have, and whether a synthesized narration came out too long
//! for the video it will be laid over.

use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

use promo_models::{MediaKind, ProductId, STILL_IMAGE_SECONDS};

use crate::probe::{probe_duration, ProbeOutcome};

/// Narration longer than this share of the video is too long.
pub const NARRATION_TOO_LONG_RATIO: f64 = 1.15;
/// Share of the video a corrected narration should aim for.
pub const NARRATION_TARGET_RATIO: f64 = 1.10;

/// Estimated duration of one media file.
#[derive(Debug, Clone, PartialEq)]
pub enum DurationEstimate {
    /// Video probed with ffprobe
    Video(ProbeOutcome),
    /// Still image, fixed duration
    Still,
    /// Path does not exist
    Missing,
    /// Extension is neither video nor image
    Unrecognized,
}

impl DurationEstimate {
    /// Seconds contributed to the product total.
    pub fn seconds(&self) -> f64 {
        match self {
            DurationEstimate::Video(outcome) => outcome.seconds(),
            DurationEstimate::Still => STILL_IMAGE_SECONDS,
            DurationEstimate::Missing | DurationEstimate::Unrecognized => 0.0,
        }
    }
}

/// Estimate for one path.
#[derive(Debug, Clone)]
pub struct ItemEstimate {
    pub path: PathBuf,
    pub estimate: DurationEstimate,
}

impl ItemEstimate {
    fn label(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string());

        match &self.estimate {
            DurationEstimate::Video(ProbeOutcome::Duration(d)) if *d > 0.0 => {
                format!("{} [{:.2}s]", name, d)
            }
            DurationEstimate::Video(_) => format!("{} [duration unreadable]", name),
            DurationEstimate::Still => format!("{} [image: {:.2}s]", name, STILL_IMAGE_SECONDS),
            DurationEstimate::Missing => format!("{} [not found]", name),
            DurationEstimate::Unrecognized => format!("{} [unsupported]", name),
        }
    }
}

/// Estimate the playback duration of a single file.
pub async fn estimate_item(path: impl AsRef<Path>) -> ItemEstimate {
    let path = path.as_ref();

    let estimate = if !path.exists() {
        DurationEstimate::Missing
    } else {
        match MediaKind::from_path(path) {
            Some(MediaKind::Video) => DurationEstimate::Video(probe_duration(path).await),
            Some(MediaKind::Image) => DurationEstimate::Still,
            None => DurationEstimate::Unrecognized,
        }
    };

    debug!(path = %path.display(), seconds = estimate.seconds(), "Estimated media duration");

    ItemEstimate {
        path: path.to_path_buf(),
        estimate,
    }
}

/// Per-item durations for a list of paths, in order.
pub async fn estimate_durations(paths: &[PathBuf]) -> Vec<f64> {
    let mut durations = Vec::with_capacity(paths.len());
    for path in paths {
        durations.push(estimate_item(path).await.estimate.seconds());
    }
    durations
}

/// Duration estimate for all media of one product.
#[derive(Debug, Clone, Default)]
pub struct ProductDuration {
    pub items: Vec<ItemEstimate>,
}

impl ProductDuration {
    /// Sum of all item durations.
    pub fn total(&self) -> f64 {
        self.items.iter().map(|i| i.estimate.seconds()).sum()
    }

    /// `a.mp4 [10.00s] + b.jpg [image: 3.00s] = 13.00s`
    pub fn log_line(&self) -> String {
        let parts: Vec<String> = self.items.iter().map(ItemEstimate::label).collect();
        format!("{} = {:.2}s", parts.join(" + "), self.total())
    }
}

/// Estimate every media file of a product.
pub async fn estimate_product(paths: &[PathBuf]) -> ProductDuration {
    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        items.push(estimate_item(path).await);
    }
    ProductDuration { items }
}

/// Estimate many products with at most `max_parallel` probing at once.
///
/// Results keep the input order.
pub async fn estimate_products(
    products: Vec<(ProductId, Vec<PathBuf>)>,
    max_parallel: usize,
) -> Vec<(ProductId, ProductDuration)> {
    let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));

    let futures = products.into_iter().map(|(product_id, paths)| {
        let semaphore = semaphore.clone();
        async move {
            // Permit is only dropped at the end; the semaphore is never closed.
            let _permit = semaphore.acquire_owned().await.ok();
            let duration = estimate_product(&paths).await;
            (product_id, duration)
        }
    });

    join_all(futures).await
}

/// Narration script length for a video: `round(minutes × wpm)`.
pub fn target_word_count(total_seconds: f64, words_per_minute: u32) -> u32 {
    if total_seconds <= 0.0 {
        return 0;
    }
    (total_seconds / 60.0 * words_per_minute as f64).round() as u32
}

/// How a synthesized narration compares to its video.
#[derive(Debug, Clone, PartialEq)]
pub enum NarrationFit {
    /// Within the accepted ratio
    Fits { ratio: f64 },
    /// Longer than accepted; a slower word budget is suggested
    TooLong { ratio: f64, recommended_wpm: u32 },
    /// One of the durations is unknown
    Unknown,
}

/// Compare narration length against the video length.
///
/// The recommendation scales the words-per-minute budget down so the next
/// script lands at `NARRATION_TARGET_RATIO` of the video.
pub fn check_narration_fit(narration_seconds: f64, video_seconds: f64, current_wpm: u32) -> NarrationFit {
    if narration_seconds <= 0.0 || video_seconds <= 0.0 {
        return NarrationFit::Unknown;
    }

    let ratio = narration_seconds / video_seconds;
    if ratio > NARRATION_TOO_LONG_RATIO {
        let recommended_wpm = (current_wpm as f64 * NARRATION_TARGET_RATIO / ratio).floor() as u32;
        NarrationFit::TooLong {
            ratio,
            recommended_wpm: recommended_wpm.max(1),
        }
    } else {
        NarrationFit::Fits { ratio }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"x").unwrap();
        path
    }

    #[tokio::test]
    async fn test_stills_are_three_seconds() {
        let dir = TempDir::new().unwrap();
        for name in ["a.jpg", "b.PNG", "c.webp", "d.gif", "e.jpeg"] {
            let item = estimate_item(touch(&dir, name)).await;
            assert_eq!(item.estimate, DurationEstimate::Still);
            assert_eq!(item.estimate.seconds(), 3.0);
        }
    }

    #[tokio::test]
    async fn test_missing_and_unreadable_are_zero() {
        let dir = TempDir::new().unwrap();

        let missing = estimate_item(dir.path().join("gone.mp4")).await;
        assert_eq!(missing.estimate, DurationEstimate::Missing);
        assert_eq!(missing.estimate.seconds(), 0.0);

        let unsupported = estimate_item(touch(&dir, "notes.txt")).await;
        assert_eq!(unsupported.estimate, DurationEstimate::Unrecognized);
        assert_eq!(unsupported.estimate.seconds(), 0.0);

        // Garbage bytes never probe successfully, with or without ffprobe installed
        let garbage = estimate_item(touch(&dir, "broken.mp4")).await;
        assert_eq!(garbage.estimate.seconds(), 0.0);
    }

    #[tokio::test]
    async fn test_product_total_and_log_line() {
        let dir = TempDir::new().unwrap();
        let paths = vec![
            touch(&dir, "one.jpg"),
            touch(&dir, "two.png"),
            dir.path().join("missing.mp4"),
        ];

        let product = estimate_product(&paths).await;
        assert_eq!(product.total(), 6.0);
        assert_eq!(
            product.log_line(),
            "one.jpg [image: 3.00s] + two.png [image: 3.00s] + missing.mp4 [not found] = 6.00s"
        );

        let durations = estimate_durations(&paths).await;
        assert_eq!(durations, vec![3.0, 3.0, 0.0]);
    }

    #[tokio::test]
    async fn test_estimate_products_keeps_order() {
        let dir = TempDir::new().unwrap();
        let products = vec![
            (ProductId::new("A"), vec![touch(&dir, "a.jpg")]),
            (ProductId::new("B"), vec![]),
            (ProductId::new("C"), vec![touch(&dir, "c1.jpg"), touch(&dir, "c2.jpg")]),
        ];

        let results = estimate_products(products, 2).await;
        let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert_eq!(results[1].1.total(), 0.0);
        assert_eq!(results[2].1.total(), 6.0);
    }

    #[test]
    fn test_target_word_count() {
        assert_eq!(target_word_count(40.0, 160), 107);
        assert_eq!(target_word_count(60.0, 150), 150);
        assert_eq!(target_word_count(0.0, 160), 0);
    }

    #[test]
    fn test_narration_fit() {
        assert_eq!(check_narration_fit(0.0, 40.0, 160), NarrationFit::Unknown);
        assert!(matches!(check_narration_fit(44.0, 40.0, 160), NarrationFit::Fits { .. }));

        match check_narration_fit(50.0, 40.0, 160) {
            NarrationFit::TooLong { ratio, recommended_wpm } => {
                assert!((ratio - 1.25).abs() < 1e-9);
                assert_eq!(recommended_wpm, 140);
            }
            other => panic!("expected TooLong, got {:?}", other),
        }
    }
}
