use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::error::{ConfigResult, ExtractSnafu};

/// Fixed geometry of a message cell, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellMetrics {
    /// Distance from the cell edge to the avatar.
    pub avatar_inset_x: f32,
    pub avatar_inset_top: f32,
    pub avatar_size: f32,

    /// Transparent blanks baked into the bubble artwork around the content.
    pub bubble_blank_left: f32,
    pub bubble_blank_right: f32,
    pub bubble_blank_top: f32,
    pub bubble_blank_bottom: f32,
    /// Width of the bubble arrow pointing at the avatar.
    pub bubble_arrow_width: f32,

    pub content_avatar_margin: f32,
    pub content_top: f32,
    pub content_bottom: f32,

    pub activity_offset_x: f32,
    pub activity_offset_y: f32,
    pub activity_size: f32,

    pub edit_control_size: f32,

    pub text_line_height: f32,
    pub text_glyph_width: f32,
    pub text_inset_x: f32,
    pub text_inset_y: f32,

    pub thumbnail_min_edge: f32,
    pub thumbnail_max_edge: f32,

    pub audio_min_width: f32,
    pub audio_max_width: f32,
    /// Seconds of audio after which the bubble stops growing.
    pub audio_width_full_secs: f32,
    pub audio_height: f32,

    pub file_card_width: f32,
    pub file_card_height: f32,
}

impl Default for CellMetrics {
    fn default() -> Self {
        Self {
            avatar_inset_x: 10.,
            avatar_inset_top: 0.,
            avatar_size: 45.,
            bubble_blank_left: 7.,
            bubble_blank_right: 7.,
            bubble_blank_top: 2.,
            bubble_blank_bottom: 11.,
            bubble_arrow_width: 7.,
            content_avatar_margin: 3.,
            content_top: 0.,
            content_bottom: 20.,
            activity_offset_x: 5.,
            // Centers the indicator on the visible bubble rather than the artwork.
            activity_offset_y: -4.,
            activity_size: 20.,
            edit_control_size: 30.,
            text_line_height: 20.,
            text_glyph_width: 8.,
            text_inset_x: 12.,
            text_inset_y: 10.,
            thumbnail_min_edge: 60.,
            thumbnail_max_edge: 140.,
            audio_min_width: 70.,
            audio_max_width: 200.,
            audio_width_full_secs: 60.,
            audio_height: 40.,
            file_card_width: 220.,
            file_card_height: 70.,
        }
    }
}

/// Tunables shared by every cell of one transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellConfig {
    pub metrics: CellMetrics,
    pub long_press_threshold_ms: u64,
    /// Maximum travel before a held touch stops counting as a tap or press.
    pub tap_slop: f32,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            metrics: CellMetrics::default(),
            long_press_threshold_ms: 500,
            tap_slop: 10.,
        }
    }
}

impl CellConfig {
    /// Reads a JSON config file merged over the defaults.
    ///
    /// Keys missing from the file keep their default, and a missing file yields the
    /// defaults unchanged.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let config = Figment::from(Serialized::defaults(Self::default()))
            .merge(Json::file(path))
            .extract::<Self>()
            .context(ExtractSnafu {
                stage: "extract-cell-config",
                path: path.to_path_buf(),
            })?;

        tracing::info!(path = %path.display(), "loaded cell config");
        Ok(config.normalized())
    }

    pub fn long_press_threshold(&self) -> Duration {
        Duration::from_millis(self.long_press_threshold_ms)
    }

    fn normalized(mut self) -> Self {
        if self.long_press_threshold_ms == 0 {
            self.long_press_threshold_ms = Self::default().long_press_threshold_ms;
        }
        if !self.tap_slop.is_finite() || self.tap_slop < 0. {
            self.tap_slop = Self::default().tap_slop;
        }
        if self.metrics.thumbnail_max_edge < self.metrics.thumbnail_min_edge {
            self.metrics.thumbnail_max_edge = self.metrics.thumbnail_min_edge;
        }
        if self.metrics.audio_max_width < self.metrics.audio_min_width {
            self.metrics.audio_max_width = self.metrics.audio_min_width;
        }
        self
    }
}
