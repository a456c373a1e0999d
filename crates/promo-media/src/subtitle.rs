//! Subtitle fitting and drawtext rendering.
//!
//! The fitter shrinks the font from the configured size until the rendered
//! width of the line fits between the side margins. Widths come from the
//! same font file drawtext will use, so the measurement matches the burn-in.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use promo_models::{Canvas, SubtitleAlign, SubtitleStyle};

use crate::error::{MediaError, MediaResult};
use crate::fonts::FALLBACK_FONT_FAMILY;
use crate::graph::{DrawText, FontSpec};

/// Measures the rendered width of a single line of text.
pub trait TextMeasure: Send + Sync {
    /// Width in pixels of `text` at `font_size` pixels.
    fn text_width(&self, text: &str, font_size: u32) -> f32;
}

/// Font metrics backed by a parsed font file.
pub struct FontMetrics {
    font: fontdue::Font,
    path: PathBuf,
}

impl FontMetrics {
    /// Load and parse a TrueType/OpenType font.
    pub fn load(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| MediaError::font_load(path, e.to_string()))?;
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| MediaError::font_load(path, e))?;

        Ok(Self {
            font,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TextMeasure for FontMetrics {
    fn text_width(&self, text: &str, font_size: u32) -> f32 {
        let px = font_size as f32;
        let mut width = 0.0;
        let mut prev: Option<char> = None;

        for c in text.chars() {
            if let Some(p) = prev {
                width += self.font.horizontal_kern(p, c, px).unwrap_or(0.0);
            }
            width += self.font.metrics(c, px).advance_width;
            prev = Some(c);
        }
        width
    }
}

/// Escape subtitle text for a single-quoted drawtext `text=` value.
pub fn escape_drawtext_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "'\\\\\\''")
        .replace(':', "\\:")
        .replace('%', "\\%")
}

/// drawtext `x` expression for an alignment.
pub fn x_expression(align: SubtitleAlign, margin: u32) -> String {
    match align {
        SubtitleAlign::Center => "(w-text_w)/2".to_string(),
        SubtitleAlign::Left => margin.to_string(),
        SubtitleAlign::Right => format!("w-text_w-{}", margin),
    }
}

/// Chooses subtitle font sizes and builds the drawtext filter.
pub struct SubtitleFitter {
    measure: Option<Box<dyn TextMeasure>>,
}

impl SubtitleFitter {
    /// Fitter for a style, measuring with its font file.
    ///
    /// A missing or unparsable font disables measuring; the starting size is
    /// then used as-is.
    pub fn for_style(style: &SubtitleStyle) -> Self {
        let measure = style.font_file.as_ref().and_then(|path| match FontMetrics::load(path) {
            Ok(metrics) => Some(Box::new(metrics) as Box<dyn TextMeasure>),
            Err(e) => {
                warn!("Subtitle font unavailable, keeping configured size: {}", e);
                None
            }
        });
        Self { measure }
    }

    /// Fitter using a custom measurer.
    pub fn with_measure(measure: impl TextMeasure + 'static) -> Self {
        Self {
            measure: Some(Box::new(measure)),
        }
    }

    /// Fitter that never measures.
    pub fn unmeasured() -> Self {
        Self { measure: None }
    }

    /// Largest size in `[min_font_size, font_size]` whose width fits inside
    /// `canvas_width - 2 * margin`. Falls back to the floor when nothing fits.
    pub fn fit(&self, text: &str, style: &SubtitleStyle, canvas: Canvas) -> u32 {
        let start = style.font_size;
        let floor = style.min_font_size;

        let Some(measure) = self.measure.as_deref() else {
            return start;
        };
        if start < floor {
            return floor;
        }

        let available = canvas.width.saturating_sub(style.margin.saturating_mul(2)) as f32;
        for size in (floor..=start).rev() {
            let width = measure.text_width(text, size);
            if width <= available {
                debug!(size, width, available, "Subtitle fits");
                return size;
            }
        }

        debug!(floor, available, "Subtitle overflows at minimum size");
        floor
    }

    /// drawtext parameters for `text` at its fitted size.
    pub fn drawtext(&self, text: &str, style: &SubtitleStyle, canvas: Canvas) -> DrawText {
        let font = match &style.font_file {
            Some(path) => FontSpec::File(path.clone()),
            None => FontSpec::Family(FALLBACK_FONT_FAMILY.to_string()),
        };

        DrawText {
            font,
            text: escape_drawtext_text(text),
            x: x_expression(style.align, style.margin),
            y: style.y,
            font_size: self.fit(text, style, canvas),
            font_color: style.font_color.clone(),
            border_width: style.border_width,
            border_color: style.border_color.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every character advances by `em` times the font size.
    struct FixedAdvance {
        em: f32,
    }

    impl TextMeasure for FixedAdvance {
        fn text_width(&self, text: &str, font_size: u32) -> f32 {
            text.chars().count() as f32 * font_size as f32 * self.em
        }
    }

    fn style() -> SubtitleStyle {
        SubtitleStyle::default()
    }

    #[test]
    fn test_short_text_keeps_start_size() {
        let fitter = SubtitleFitter::with_measure(FixedAdvance { em: 0.5 });
        assert_eq!(fitter.fit("Door Switch", &style(), Canvas::FULL_HD), 85);
    }

    #[test]
    fn test_long_text_shrinks_within_bounds() {
        let fitter = SubtitleFitter::with_measure(FixedAdvance { em: 0.5 });
        let text = "x".repeat(50);
        let size = fitter.fit(&text, &style(), Canvas::FULL_HD);
        // 50 * 0.5 * size <= 1720  =>  size <= 68
        assert_eq!(size, 68);
        assert!(size <= style().font_size);
        assert!(size >= style().min_font_size);
    }

    #[test]
    fn test_overflow_uses_floor() {
        let fitter = SubtitleFitter::with_measure(FixedAdvance { em: 0.5 });
        let text = "x".repeat(500);
        assert_eq!(fitter.fit(&text, &style(), Canvas::FULL_HD), 30);
    }

    #[test]
    fn test_huge_margin_uses_floor() {
        let fitter = SubtitleFitter::with_measure(FixedAdvance { em: 0.5 });
        let s = SubtitleStyle {
            margin: u32::MAX,
            ..style()
        };
        assert_eq!(fitter.fit("Door Switch", &s, Canvas::FULL_HD), s.min_font_size);
    }

    #[test]
    fn test_raising_start_above_fit_point_is_stable() {
        let fitter = SubtitleFitter::with_measure(FixedAdvance { em: 0.5 });
        let text = "x".repeat(50);
        let mut s = style();
        let mut seen = Vec::new();
        for start in [68, 80, 120, 200] {
            s.font_size = start;
            seen.push(fitter.fit(&text, &s, Canvas::FULL_HD));
        }
        assert!(seen.iter().all(|&size| size == 68), "{:?}", seen);
    }

    #[test]
    fn test_unloadable_font_keeps_start_size() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.ttf");
        std::fs::write(&bogus, b"not a font").unwrap();

        let mut s = style();
        s.font_file = Some(bogus);
        let fitter = SubtitleFitter::for_style(&s);
        assert_eq!(fitter.fit(&"x".repeat(500), &s, Canvas::FULL_HD), 85);

        assert!(FontMetrics::load("/nonexistent/font.ttf").is_err());
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_drawtext_text("Only 50% off: today"), "Only 50\\% off\\: today");
        assert_eq!(escape_drawtext_text("Kid's"), "Kid'\\\\\\''s");
        assert_eq!(escape_drawtext_text("plain"), "plain");
    }

    #[test]
    fn test_alignment_expressions() {
        assert_eq!(x_expression(SubtitleAlign::Center, 100), "(w-text_w)/2");
        assert_eq!(x_expression(SubtitleAlign::Left, 100), "100");
        assert_eq!(x_expression(SubtitleAlign::Right, 100), "w-text_w-100");
    }

    #[test]
    fn test_drawtext_uses_family_without_font_file() {
        let dt = SubtitleFitter::unmeasured().drawtext("Hi: there", &style(), Canvas::FULL_HD);
        assert_eq!(dt.font, FontSpec::Family(FALLBACK_FONT_FAMILY.to_string()));
        assert_eq!(dt.text, "Hi\\: there");
        assert_eq!(dt.font_size, 85);
        assert_eq!(dt.y, 100);
    }
}
