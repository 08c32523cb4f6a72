//! Deterministic label measurement.
//!
//! Widths come from per-character width classes scaled by an average glyph
//! ratio, so auto-fit produces the same box on every host regardless of the
//! fonts a render surface actually has installed.

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Font family approximation used for measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontPreset {
    #[default]
    SansSerif,
    Serif,
    Monospace,
    Condensed,
}

impl FontPreset {
    #[must_use]
    pub fn from_family(family: &str) -> Self {
        let lower = family.to_lowercase();
        if ["mono", "courier", "consolas", "menlo"]
            .iter()
            .any(|needle| lower.contains(needle))
        {
            Self::Monospace
        } else if lower.contains("condensed") || lower.contains("narrow") {
            Self::Condensed
        } else if lower.contains("times")
            || lower.contains("georgia")
            || (lower.contains("serif") && !lower.contains("sans"))
        {
            Self::Serif
        } else {
            Self::SansSerif
        }
    }

    /// Average glyph advance relative to the em size.
    #[must_use]
    pub const fn avg_char_ratio(self) -> f64 {
        match self {
            Self::SansSerif => 0.55,
            Self::Serif => 0.52,
            Self::Monospace => 0.60,
            Self::Condensed => 0.45,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharWidthClass {
    VeryNarrow,
    Narrow,
    Half,
    Normal,
    Wide,
    VeryWide,
    /// Full-width East Asian glyphs.
    FullWidth,
}

impl CharWidthClass {
    #[must_use]
    pub fn classify(c: char) -> Self {
        match c {
            'i' | 'l' | '|' | '!' | '\'' | '.' | ',' | ':' | ';' => Self::VeryNarrow,
            'I' | 'j' | 't' | 'f' | 'r' | '(' | ')' | '[' | ']' => Self::Narrow,
            ' ' => Self::Half,
            'w' | 'm' => Self::Wide,
            'W' | 'M' | '@' | '%' | '&' => Self::VeryWide,
            '\u{1100}'..='\u{115F}'
            | '\u{2E80}'..='\u{A4CF}'
            | '\u{AC00}'..='\u{D7A3}'
            | '\u{F900}'..='\u{FAFF}'
            | '\u{FF00}'..='\u{FF60}'
            | '\u{FFE0}'..='\u{FFE6}' => Self::FullWidth,
            _ => Self::Normal,
        }
    }

    #[must_use]
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::VeryNarrow => 0.4,
            Self::Narrow => 0.6,
            Self::Half => 0.5,
            Self::Normal => 1.0,
            Self::Wide => 1.2,
            Self::VeryWide => 1.5,
            Self::FullWidth => 1.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FontMetricsConfig {
    pub preset: FontPreset,
    /// Font size in model units.
    pub font_size: f64,
    /// Line height as a multiple of the font size.
    pub line_height: f64,
}

impl Default for FontMetricsConfig {
    fn default() -> Self {
        Self {
            preset: FontPreset::SansSerif,
            font_size: 14.0,
            line_height: 1.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    config: FontMetricsConfig,
    avg_char_width: f64,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self::new(FontMetricsConfig::default())
    }
}

impl FontMetrics {
    #[must_use]
    pub fn new(config: FontMetricsConfig) -> Self {
        Self {
            avg_char_width: config.font_size * config.preset.avg_char_ratio(),
            config,
        }
    }

    /// Same preset and line height at another font size.
    #[must_use]
    pub fn with_font_size(&self, font_size: f64) -> Self {
        Self::new(FontMetricsConfig {
            font_size,
            ..self.config
        })
    }

    #[must_use]
    pub const fn config(&self) -> &FontMetricsConfig {
        &self.config
    }

    #[must_use]
    pub fn font_size(&self) -> f64 {
        self.config.font_size
    }

    #[must_use]
    pub fn line_height_px(&self) -> f64 {
        self.config.font_size * self.config.line_height
    }

    /// Width of one line of text. Each grapheme cluster is measured by its
    /// base character so combining marks add nothing.
    #[must_use]
    pub fn estimate_width(&self, text: &str) -> f64 {
        text.graphemes(true)
            .filter_map(|grapheme| grapheme.chars().next())
            .map(|c| self.avg_char_width * CharWidthClass::classify(c).multiplier())
            .sum()
    }

    /// Widest line of possibly multi-line text.
    #[must_use]
    pub fn estimate_multiline_width(&self, text: &str) -> f64 {
        text.lines()
            .map(|line| self.estimate_width(line))
            .fold(0.0_f64, f64::max)
    }

    /// Greedy word wrap. A single word wider than `max_width` keeps its own line.
    #[must_use]
    pub fn wrap_to_width(&self, text: &str, max_width: f64) -> Vec<String> {
        let space_width = self.estimate_width(" ");
        let mut lines = Vec::new();

        for line in text.lines() {
            if self.estimate_width(line) <= max_width {
                lines.push(line.to_string());
                continue;
            }

            let mut current = String::new();
            let mut current_width = 0.0;
            for word in line.split_whitespace() {
                let word_width = self.estimate_width(word);
                if current.is_empty() {
                    current.push_str(word);
                    current_width = word_width;
                } else if current_width + space_width + word_width <= max_width {
                    current.push(' ');
                    current.push_str(word);
                    current_width += space_width + word_width;
                } else {
                    lines.push(std::mem::take(&mut current));
                    current.push_str(word);
                    current_width = word_width;
                }
            }
            if !current.is_empty() {
                lines.push(current);
            }
        }

        if lines.is_empty() {
            lines.push(String::new());
        }
        lines
    }

    /// Height of `text` once wrapped at `wrap_width`.
    #[must_use]
    pub fn wrapped_height(&self, text: &str, wrap_width: f64) -> f64 {
        self.wrap_to_width(text, wrap_width).len() as f64 * self.line_height_px()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_follows_character_classes() {
        let metrics = FontMetrics::default();
        let narrow = metrics.estimate_width("iii");
        let normal = metrics.estimate_width("aaa");
        let wide = metrics.estimate_width("WWW");
        assert!(narrow < normal);
        assert!(normal < wide);
    }

    #[test]
    fn width_scales_with_font_size() {
        let small = FontMetrics::default();
        let large = small.with_font_size(28.0);
        let text = "Define scope";
        assert!((large.estimate_width(text) - 2.0 * small.estimate_width(text)).abs() < 1e-9);
    }

    #[test]
    fn combining_marks_do_not_add_width() {
        let metrics = FontMetrics::default();
        assert_eq!(metrics.estimate_width("e\u{301}"), metrics.estimate_width("e"));
    }

    #[test]
    fn full_width_glyphs_measure_wider() {
        let metrics = FontMetrics::default();
        assert!(metrics.estimate_width("計画") > metrics.estimate_width("ab"));
    }

    #[test]
    fn wrap_keeps_short_lines_and_splits_long_ones() {
        let metrics = FontMetrics::default();
        assert_eq!(metrics.wrap_to_width("Short", 200.0), vec!["Short".to_string()]);
        let wrapped = metrics.wrap_to_width(
            "Identify stakeholders and agree the communication plan",
            100.0,
        );
        assert!(wrapped.len() > 1);
        assert_eq!(metrics.wrap_to_width("", 50.0), vec![String::new()]);
    }

    #[test]
    fn wrapped_height_counts_lines() {
        let metrics = FontMetrics::default();
        let one = metrics.wrapped_height("Plan", 200.0);
        assert!((one - metrics.line_height_px()).abs() < 1e-9);
        assert!(metrics.wrapped_height("Plan the whole delivery schedule", 40.0) > one);
    }

    #[test]
    fn preset_detection_from_family_names() {
        assert_eq!(FontPreset::from_family("Courier New"), FontPreset::Monospace);
        assert_eq!(FontPreset::from_family("Georgia"), FontPreset::Serif);
        assert_eq!(FontPreset::from_family("Arial Narrow"), FontPreset::Condensed);
        assert_eq!(FontPreset::from_family("Helvetica"), FontPreset::SansSerif);
    }
}
