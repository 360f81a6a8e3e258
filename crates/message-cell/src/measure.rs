//! Pure content measurement.
//!
//! Nothing in here touches cell state, so hosts can pre-measure rows on a
//! background thread and memoize the result with [`HeightCache`].

use std::collections::{HashMap, HashSet};

use crate::config::CellMetrics;
use crate::geometry::Size;
use crate::model::{MessageContent, MessageId, MessageModel, PixelSize, layout_hash};

/// Width change below this is treated as the same measuring width.
const WIDTH_CHANGE_EPSILON: f32 = 0.5;

/// Widest a bubble may grow inside a row of `max_content_width`.
///
/// Both sides reserve room for an avatar so sent and received bubbles never reach
/// across to the opposite edge.
pub fn max_bubble_width(max_content_width: f32, metrics: &CellMetrics) -> f32 {
    let reserved =
        (metrics.avatar_inset_x + metrics.avatar_size + metrics.content_avatar_margin) * 2.;
    (max_content_width - reserved).max(0.)
}

/// Size of the content area inside the bubble artwork.
pub fn content_size(model: &MessageModel, max_content_width: f32, metrics: &CellMetrics) -> Size {
    let max_bubble = max_bubble_width(max_content_width, metrics);
    let max_content = (max_bubble - horizontal_blanks(metrics)).max(0.);

    match &model.content {
        MessageContent::Text { text } => text_content_size(text, max_content, metrics),
        MessageContent::Image { pixel_size, .. } | MessageContent::Video { pixel_size, .. } => {
            thumbnail_size(*pixel_size, max_content, metrics)
        }
        MessageContent::Audio { duration_secs } => {
            audio_size(*duration_secs, max_content, metrics)
        }
        MessageContent::File { .. } => Size::new(
            metrics.file_card_width.min(max_content),
            metrics.file_card_height,
        ),
        MessageContent::Unsupported => placeholder_size(metrics),
    }
}

/// Size of the bubble artwork: content plus its transparent blanks and arrow.
pub fn bubble_size(model: &MessageModel, max_content_width: f32, metrics: &CellMetrics) -> Size {
    let content = content_size(model, max_content_width, metrics);
    Size::new(
        content.width + horizontal_blanks(metrics),
        content.height + metrics.bubble_blank_top + metrics.bubble_blank_bottom,
    )
}

/// Row height for `model` in a list of width `max_content_width`.
pub fn height_for_model(model: &MessageModel, max_content_width: f32, metrics: &CellMetrics) -> f32 {
    let bubble = bubble_size(model, max_content_width, metrics);
    row_height(bubble.height, metrics)
}

/// Height of a row holding a single line of text, the smallest row a message produces.
pub fn min_single_line_height(metrics: &CellMetrics) -> f32 {
    let content = placeholder_size(metrics);
    row_height(
        content.height + metrics.bubble_blank_top + metrics.bubble_blank_bottom,
        metrics,
    )
}

pub(crate) fn row_height(bubble_height: f32, metrics: &CellMetrics) -> f32 {
    let avatar_column = metrics.avatar_inset_top + metrics.avatar_size;
    let bubble_column = metrics.content_top + bubble_height;
    avatar_column.max(bubble_column) + metrics.content_bottom
}

fn horizontal_blanks(metrics: &CellMetrics) -> f32 {
    metrics.bubble_blank_left + metrics.bubble_blank_right + metrics.bubble_arrow_width
}

fn placeholder_size(metrics: &CellMetrics) -> Size {
    Size::new(
        metrics.text_glyph_width + metrics.text_inset_x * 2.,
        metrics.text_line_height + metrics.text_inset_y * 2.,
    )
}

fn text_content_size(text: &str, max_content: f32, metrics: &CellMetrics) -> Size {
    let max_text_width = (max_content - metrics.text_inset_x * 2.).max(metrics.text_glyph_width);
    let glyph_width = metrics.text_glyph_width.max(1.);
    let chars_per_line = (max_text_width / glyph_width).floor().max(1.) as usize;

    let mut line_count = 0usize;
    let mut widest_line = 0usize;
    for line in text.split('\n') {
        let char_count = line.chars().count().max(1);
        line_count += char_count.div_ceil(chars_per_line);
        widest_line = widest_line.max(char_count.min(chars_per_line));
    }

    let text_width = widest_line.max(1) as f32 * glyph_width;
    Size::new(
        text_width.min(max_text_width) + metrics.text_inset_x * 2.,
        line_count.max(1) as f32 * metrics.text_line_height + metrics.text_inset_y * 2.,
    )
}

fn thumbnail_size(pixel_size: Option<PixelSize>, max_content: f32, metrics: &CellMetrics) -> Size {
    let max_edge = metrics.thumbnail_max_edge.min(max_content).max(0.);
    let min_edge = metrics.thumbnail_min_edge.min(max_edge);

    let Some(pixels) = pixel_size.filter(|size| size.width > 0 && size.height > 0) else {
        return Size::new(min_edge, min_edge);
    };

    let width = pixels.width as f32;
    let height = pixels.height as f32;
    // Fit the long edge to the max box, then lift the short edge to the minimum.
    let scale = max_edge / width.max(height);
    let fitted_width = (width * scale).clamp(min_edge, max_edge);
    let fitted_height = (height * scale).clamp(min_edge, max_edge);
    Size::new(fitted_width.round(), fitted_height.round())
}

fn audio_size(duration_secs: f32, max_content: f32, metrics: &CellMetrics) -> Size {
    let duration = if duration_secs.is_finite() {
        duration_secs.max(0.)
    } else {
        0.
    };
    let full = metrics.audio_width_full_secs.max(1.);
    let progress = (duration / full).min(1.);
    let width = metrics.audio_min_width + (metrics.audio_max_width - metrics.audio_min_width) * progress;
    Size::new(width.min(max_content), metrics.audio_height)
}

struct HeightCacheEntry {
    layout_hash: u64,
    width: f32,
    height: f32,
}

/// Host-side memo of row heights, keyed by message id.
///
/// Entries are invalidated only when the layout hash or the measuring width changes.
#[derive(Default)]
pub struct HeightCache {
    entries: HashMap<MessageId, HeightCacheEntry>,
    hits: u64,
    misses: u64,
}

impl HeightCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn height(&mut self, model: &MessageModel, max_content_width: f32, metrics: &CellMetrics) -> f32 {
        let next_hash = layout_hash(model);

        let cached = self.entries.get(&model.id).filter(|entry| {
            entry.layout_hash == next_hash
                && (entry.width - max_content_width).abs() <= WIDTH_CHANGE_EPSILON
        });
        if let Some(entry) = cached {
            self.hits += 1;
            return entry.height;
        }

        self.misses += 1;
        let height = height_for_model(model, max_content_width, metrics);
        self.entries.insert(
            model.id,
            HeightCacheEntry {
                layout_hash: next_hash,
                width: max_content_width,
                height,
            },
        );
        height
    }

    /// Drops entries for messages that left the transcript.
    pub fn retain_ids(&mut self, active: &HashSet<MessageId>) {
        self.entries.retain(|id, _| active.contains(id));
    }

    pub fn invalidate(&mut self, id: MessageId) {
        self.entries.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `(hits, misses)` since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, MessageId};

    const ROW_WIDTH: f32 = 375.;

    fn text(body: &str) -> MessageModel {
        MessageModel::text(MessageId::new(1), Direction::ToMe, body)
    }

    #[test]
    fn text_height_is_monotonic_in_length() {
        let metrics = CellMetrics::default();
        let mut body = String::new();
        let mut previous = height_for_model(&text(&body), ROW_WIDTH, &metrics);

        for index in 0..600 {
            body.push(if index % 37 == 0 { '\n' } else { 'x' });
            let next = height_for_model(&text(&body), ROW_WIDTH, &metrics);
            assert!(next >= previous, "height shrank at {index}: {previous} -> {next}");
            previous = next;
        }
    }

    #[test]
    fn measurement_is_deterministic() {
        let metrics = CellMetrics::default();
        let model = text("deterministic measurement with wrapping text that spans lines");
        let first = height_for_model(&model, ROW_WIDTH, &metrics);
        for _ in 0..10 {
            assert_eq!(height_for_model(&model, ROW_WIDTH, &metrics), first);
        }
    }

    #[test]
    fn one_line_text_uses_min_single_line_height() {
        let metrics = CellMetrics::default();
        let model = MessageModel::text(MessageId::new(2), Direction::FromMe, "hi");
        assert_eq!(
            height_for_model(&model, ROW_WIDTH, &metrics),
            min_single_line_height(&metrics)
        );
        assert_eq!(
            height_for_model(&text(""), ROW_WIDTH, &metrics),
            min_single_line_height(&metrics)
        );
    }

    #[test]
    fn long_text_wraps_within_max_bubble_width() {
        let metrics = CellMetrics::default();
        let model = text(&"w".repeat(400));
        let bubble = bubble_size(&model, ROW_WIDTH, &metrics);
        assert!(bubble.width <= max_bubble_width(ROW_WIDTH, &metrics));
        assert!(bubble.height > metrics.text_line_height * 5.);
    }

    #[test]
    fn height_never_drops_below_avatar_column() {
        let metrics = CellMetrics {
            text_line_height: 1.,
            text_inset_y: 0.,
            ..CellMetrics::default()
        };
        let height = height_for_model(&text("a"), ROW_WIDTH, &metrics);
        assert!(height >= metrics.avatar_size + metrics.avatar_inset_top + metrics.content_bottom);
    }

    #[test]
    fn thumbnails_keep_aspect_within_edge_bounds() {
        let metrics = CellMetrics::default();
        let wide = MessageModel::image(MessageId::new(3), Direction::ToMe, PixelSize::new(4000, 1000));
        let size = content_size(&wide, ROW_WIDTH, &metrics);
        assert_eq!(size.width, metrics.thumbnail_max_edge);
        assert_eq!(size.height, metrics.thumbnail_min_edge);

        let tall = MessageModel::image(MessageId::new(4), Direction::ToMe, PixelSize::new(300, 600));
        let size = content_size(&tall, ROW_WIDTH, &metrics);
        assert_eq!(size.height, metrics.thumbnail_max_edge);
        assert_eq!(size.width, 70.);
    }

    #[test]
    fn malformed_media_falls_back_to_placeholder_boxes() {
        let metrics = CellMetrics::default();
        let zero = MessageModel::image(MessageId::new(5), Direction::ToMe, PixelSize::new(0, 0));
        let size = content_size(&zero, ROW_WIDTH, &metrics);
        assert_eq!(size, Size::new(metrics.thumbnail_min_edge, metrics.thumbnail_min_edge));

        let unsupported = MessageModel::new(MessageId::new(6), Direction::ToMe, MessageContent::Unsupported);
        assert_eq!(
            height_for_model(&unsupported, ROW_WIDTH, &metrics),
            min_single_line_height(&metrics)
        );

        let audio = MessageModel::new(
            MessageId::new(7),
            Direction::ToMe,
            MessageContent::Audio { duration_secs: f32::NAN },
        );
        assert_eq!(content_size(&audio, ROW_WIDTH, &metrics).width, metrics.audio_min_width);
    }

    #[test]
    fn zero_width_row_never_goes_negative() {
        let metrics = CellMetrics::default();
        for model in [
            text("some text"),
            MessageModel::image(MessageId::new(8), Direction::FromMe, PixelSize::new(10, 10)),
        ] {
            let bubble = bubble_size(&model, 0., &metrics);
            assert!(bubble.width >= 0. && bubble.height >= 0.);
            assert!(height_for_model(&model, 0., &metrics) > 0.);
        }
    }

    #[test]
    fn measurement_runs_off_thread() {
        let metrics = CellMetrics::default();
        let model = text("measured elsewhere");
        let expected = height_for_model(&model, ROW_WIDTH, &metrics);
        let measured = std::thread::spawn(move || height_for_model(&model, ROW_WIDTH, &metrics))
            .join()
            .expect("measure thread");
        assert_eq!(measured, expected);
    }

    #[test]
    fn cache_invalidates_on_content_or_width_change() {
        let metrics = CellMetrics::default();
        let mut cache = HeightCache::new();
        let model = text("cached");

        cache.height(&model, ROW_WIDTH, &metrics);
        cache.height(&model, ROW_WIDTH, &metrics);
        assert_eq!(cache.stats(), (1, 1));

        cache.height(&model, ROW_WIDTH + 40., &metrics);
        assert_eq!(cache.stats(), (1, 2));

        let edited = text(&"cached and then edited into a much longer body ".repeat(8));
        let height = cache.height(&edited, ROW_WIDTH + 40., &metrics);
        assert_eq!(height, height_for_model(&edited, ROW_WIDTH + 40., &metrics));
        assert_eq!(cache.stats(), (1, 3));

        cache.retain_ids(&HashSet::new());
        assert!(cache.is_empty());
    }
}
