//! System font discovery for burned-in subtitles.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Fontconfig family used by drawtext when no font file is known.
pub const FALLBACK_FONT_FAMILY: &str = "DejaVu Sans";

#[cfg(target_os = "windows")]
const FONT_CANDIDATES: &[&str] = &[
    "C:/Windows/Fonts/arialbd.ttf",
    "C:/Windows/Fonts/arial.ttf",
    "C:/Windows/Fonts/calibrib.ttf",
    "C:/Windows/Fonts/calibri.ttf",
];

#[cfg(target_os = "macos")]
const FONT_CANDIDATES: &[&str] = &[
    "/System/Library/Fonts/Arial.ttc",
    "/System/Library/Fonts/Helvetica.ttc",
    "/System/Library/Fonts/AppleSDGothicNeo.ttc",
    "/Library/Fonts/Arial.ttf",
];

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/ubuntu/Ubuntu-Bold.ttf",
    "/usr/share/fonts/truetype/ubuntu/Ubuntu-Bold.ttf",
];

/// Bold sans-serif candidates for the current OS, most preferred first.
pub fn font_candidates() -> &'static [&'static str] {
    FONT_CANDIDATES
}

/// Pick a subtitle font: an existing override wins, then the first
/// existing system candidate.
pub fn discover_font(override_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = override_path {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        debug!(path = %path.display(), "Configured subtitle font does not exist, searching system fonts");
    }

    first_existing(FONT_CANDIDATES.iter().map(Path::new))
}

fn first_existing<'a>(candidates: impl IntoIterator<Item = &'a Path>) -> Option<PathBuf> {
    candidates
        .into_iter()
        .find(|p| p.is_file())
        .map(Path::to_path_buf)
}
