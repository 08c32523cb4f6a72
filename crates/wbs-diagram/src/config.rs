use serde::{Deserialize, Serialize};
use wbs_core::{FontMetrics, FontMetricsConfig, FontPreset, WbsError};

/// Tunables of a [`crate::DiagramEngine`]. Missing keys take defaults when
/// deserialized, so a config file only needs the values it changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Grid pitch in screen pixels.
    pub grid_pitch: f64,
    pub snap_to_grid: bool,
    /// Undo entries kept before the oldest is evicted.
    pub history_capacity: usize,
    pub node_width: f64,
    pub node_height: f64,
    /// Auto-fit clamps measured widths into `[min_width, max_width]`.
    pub min_width: f64,
    pub max_width: f64,
    /// Horizontal padding on each side of a label.
    pub label_padding: f64,
    pub font_size: f64,
    pub line_height: f64,
    pub font_preset: FontPreset,
    /// Grid steps per nudge while the coarse modifier is held.
    pub coarse_nudge_steps: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_pitch: 20.0,
            snap_to_grid: true,
            history_capacity: 100,
            node_width: 160.0,
            node_height: 48.0,
            min_width: 80.0,
            max_width: 320.0,
            label_padding: 12.0,
            font_size: 14.0,
            line_height: 1.3,
            font_preset: FontPreset::SansSerif,
            coarse_nudge_steps: 10,
        }
    }
}

impl EngineConfig {
    /// Small boxes for dense trees.
    #[must_use]
    pub fn compact() -> Self {
        Self {
            grid_pitch: 10.0,
            node_width: 120.0,
            node_height: 32.0,
            min_width: 60.0,
            max_width: 240.0,
            label_padding: 8.0,
            font_size: 12.0,
            ..Self::default()
        }
    }

    /// Large boxes and type for slides.
    #[must_use]
    pub fn presentation() -> Self {
        Self {
            grid_pitch: 25.0,
            node_width: 220.0,
            node_height: 64.0,
            min_width: 120.0,
            max_width: 440.0,
            label_padding: 16.0,
            font_size: 20.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), WbsError> {
        let positive = [
            ("grid_pitch", self.grid_pitch),
            ("node_width", self.node_width),
            ("node_height", self.node_height),
            ("min_width", self.min_width),
            ("max_width", self.max_width),
            ("font_size", self.font_size),
            ("line_height", self.line_height),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(WbsError::invalid_config(field, format!("must be positive, got {value}")));
            }
        }
        if !(self.label_padding.is_finite() && self.label_padding >= 0.0) {
            return Err(WbsError::invalid_config("label_padding", "must not be negative"));
        }
        if self.min_width > self.max_width {
            return Err(WbsError::invalid_config(
                "min_width",
                format!("{} exceeds max_width {}", self.min_width, self.max_width),
            ));
        }
        if self.history_capacity == 0 {
            return Err(WbsError::invalid_config("history_capacity", "must be at least 1"));
        }
        if self.coarse_nudge_steps == 0 {
            return Err(WbsError::invalid_config("coarse_nudge_steps", "must be at least 1"));
        }
        Ok(())
    }

    #[must_use]
    pub fn font_metrics(&self) -> FontMetrics {
        FontMetrics::new(FontMetricsConfig {
            preset: self.font_preset,
            font_size: self.font_size,
            line_height: self.line_height,
        })
    }
}
