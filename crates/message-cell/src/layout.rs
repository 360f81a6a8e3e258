use crate::config::CellMetrics;
use crate::geometry::{Point, Rect, Size};
use crate::measure::row_height;
use crate::model::Direction;

/// Every sub-frame of one laid-out cell, in cell-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CellGeometry {
    pub avatar: Rect,
    /// Bubble artwork including its transparent blanks.
    pub bubble: Rect,
    pub content: Rect,
    pub status: Rect,
    /// Present only while editing.
    pub selection: Option<Rect>,
    pub total_height: f32,
}

impl CellGeometry {
    /// The visible part of the bubble, without the transparent blanks.
    pub fn visible_bubble(&self, metrics: &CellMetrics) -> Rect {
        self.bubble.inset(
            metrics.bubble_blank_left,
            metrics.bubble_blank_top,
            metrics.bubble_blank_right,
            metrics.bubble_blank_bottom,
        )
    }
}

/// Everything a layout pass depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutInput {
    pub direction: Direction,
    pub cell_width: f32,
    /// Bubble size as measured for the bound content.
    pub bubble_size: Size,
    pub is_editing: bool,
}

/// Positions avatar, bubble, content, status and selection frames.
///
/// Both passes are pure functions of their input, so repeating them on unchanged
/// state reproduces identical frames.
#[derive(Debug, Clone, Copy)]
pub struct LayoutEngine {
    metrics: CellMetrics,
}

impl LayoutEngine {
    pub fn new(metrics: CellMetrics) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &CellMetrics {
        &self.metrics
    }

    pub fn layout_content(&self, input: &LayoutInput) -> CellGeometry {
        let metrics = &self.metrics;
        let cell_width = input.cell_width.max(0.);
        let is_from_me = input.direction.is_from_me();
        // Editing reserves the leading slot; everything else lives in what is left.
        let shift = self.edit_shift(input);
        let region_width = (cell_width - shift).max(0.);

        let avatar_x = if is_from_me {
            (region_width - metrics.avatar_inset_x - metrics.avatar_size).max(0.)
        } else {
            metrics.avatar_inset_x
        };
        let avatar = Rect::new(
            avatar_x,
            metrics.avatar_inset_top,
            metrics.avatar_size,
            metrics.avatar_size,
        );

        let bubble = self.bubble_frame(&avatar, input.bubble_size, region_width, is_from_me);

        // The arrow side sits next to the avatar and carries the extra inset.
        let (inset_left, inset_right) = if is_from_me {
            (
                metrics.bubble_blank_left,
                metrics.bubble_blank_right + metrics.bubble_arrow_width,
            )
        } else {
            (
                metrics.bubble_blank_left + metrics.bubble_arrow_width,
                metrics.bubble_blank_right,
            )
        };
        let content = bubble.inset(
            inset_left,
            metrics.bubble_blank_top,
            inset_right,
            metrics.bubble_blank_bottom,
        );

        let mut geometry = CellGeometry {
            avatar: avatar.offset_by(shift, 0.),
            bubble: bubble.offset_by(shift, 0.),
            content: content.offset_by(shift, 0.),
            status: Rect::ZERO,
            selection: input.is_editing.then(|| self.selection_slot()),
            total_height: row_height(bubble.size.height, metrics),
        };
        self.layout_status_views(&mut geometry, input);

        geometry
    }

    /// Places the spinner/retry slot beside the bubble, away from the avatar.
    ///
    /// The slot is kept inside the row and clear of the selection slot.
    pub fn layout_status_views(&self, geometry: &mut CellGeometry, input: &LayoutInput) {
        let metrics = &self.metrics;
        let size = metrics.activity_size;
        let bubble = geometry.bubble;
        let leading = if input.is_editing {
            self.selection_slot().max_x()
        } else {
            0.
        };
        let trailing = (input.cell_width - size).max(leading);

        let x = if input.direction.is_from_me() {
            bubble.min_x() - metrics.activity_offset_x - size
        } else {
            bubble.max_x() + metrics.activity_offset_x
        };
        let y = (bubble.mid_y() - size / 2. + metrics.activity_offset_y).max(0.);

        geometry.status = Rect::new(x.clamp(leading, trailing), y, size, size);
    }

    /// Translates the content frame into window coordinates for menu anchoring.
    pub fn content_frame_in_window(&self, geometry: &CellGeometry, cell_origin: Point) -> Rect {
        geometry.content.offset_by(cell_origin.x, cell_origin.y)
    }

    fn bubble_frame(&self, avatar: &Rect, bubble_size: Size, cell_width: f32, is_from_me: bool) -> Rect {
        let metrics = &self.metrics;
        let y = metrics.content_top;

        if is_from_me {
            let max_x = (avatar.min_x() - metrics.content_avatar_margin).max(0.);
            let width = bubble_size.width.min(max_x);
            Rect::new(max_x - width, y, width, bubble_size.height)
        } else {
            let x = avatar.max_x() + metrics.content_avatar_margin;
            let width = bubble_size.width.min((cell_width - x).max(0.));
            Rect::new(x, y, width, bubble_size.height)
        }
    }

    fn edit_shift(&self, input: &LayoutInput) -> f32 {
        if input.is_editing {
            self.metrics.edit_control_size
        } else {
            0.
        }
    }

    fn selection_slot(&self) -> Rect {
        let metrics = &self.metrics;
        let size = metrics.edit_control_size;
        let slot_y = metrics.avatar_inset_top + (metrics.avatar_size - size) / 2.;
        Rect::new(metrics.avatar_inset_x, slot_y.max(0.), size, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure;

    const CELL_WIDTH: f32 = 375.;

    fn input(direction: Direction, bubble_size: Size, is_editing: bool) -> LayoutInput {
        LayoutInput {
            direction,
            cell_width: CELL_WIDTH,
            bubble_size,
            is_editing,
        }
    }

    #[test]
    fn received_messages_pin_avatar_to_leading_edge() {
        let engine = LayoutEngine::new(CellMetrics::default());
        let geometry = engine.layout_content(&input(Direction::ToMe, Size::new(120., 53.), false));

        assert_eq!(geometry.avatar, Rect::new(10., 0., 45., 45.));
        assert_eq!(geometry.bubble.min_x(), 58.);
        assert!(!geometry.bubble.intersects(&geometry.avatar));
        assert!(geometry.status.min_x() >= geometry.bubble.max_x());
    }

    #[test]
    fn sent_messages_grow_leftwards_from_trailing_avatar() {
        let engine = LayoutEngine::new(CellMetrics::default());
        let geometry = engine.layout_content(&input(Direction::FromMe, Size::new(120., 53.), false));

        assert_eq!(geometry.avatar.max_x(), CELL_WIDTH - 10.);
        assert_eq!(geometry.bubble.max_x(), geometry.avatar.min_x() - 3.);
        assert_eq!(geometry.bubble.size.width, 120.);
        assert!(geometry.status.max_x() <= geometry.bubble.min_x());
    }

    #[test]
    fn repeated_layout_is_identical() {
        let engine = LayoutEngine::new(CellMetrics::default());
        for direction in [Direction::ToMe, Direction::FromMe] {
            for is_editing in [false, true] {
                let layout_input = input(direction, Size::new(200., 90.), is_editing);
                let first = engine.layout_content(&layout_input);
                let second = engine.layout_content(&layout_input);
                assert_eq!(first, second);

                let mut again = second;
                engine.layout_status_views(&mut again, &layout_input);
                engine.layout_status_views(&mut again, &layout_input);
                assert_eq!(again, first);
            }
        }
    }

    #[test]
    fn editing_shifts_received_frames_by_the_selection_slot() {
        let engine = LayoutEngine::new(CellMetrics::default());
        let size = Size::new(150., 60.);
        let idle = engine.layout_content(&input(Direction::ToMe, size, false));
        let editing = engine.layout_content(&input(Direction::ToMe, size, true));

        assert!(idle.selection.is_none());
        let selection = editing.selection.expect("selection slot while editing");
        assert_eq!(selection, Rect::new(10., 7.5, 30., 30.));
        assert_eq!(editing.avatar, idle.avatar.offset_by(30., 0.));
        assert_eq!(editing.bubble, idle.bubble.offset_by(30., 0.));
        assert_eq!(editing.content, idle.content.offset_by(30., 0.));
        assert_eq!(editing.status, idle.status.offset_by(30., 0.));
        assert_eq!(editing.total_height, idle.total_height);
    }

    #[test]
    fn editing_keeps_sent_avatar_on_the_trailing_edge() {
        let engine = LayoutEngine::new(CellMetrics::default());
        let size = Size::new(150., 60.);
        let idle = engine.layout_content(&input(Direction::FromMe, size, false));
        let editing = engine.layout_content(&input(Direction::FromMe, size, true));

        assert!(editing.selection.is_some());
        assert_eq!(editing.avatar.max_x(), CELL_WIDTH - 10.);
        assert_eq!(editing.avatar, idle.avatar);
        assert_eq!(editing.bubble, idle.bubble);
        assert_eq!(editing.bubble.max_x(), editing.avatar.min_x() - 3.);
    }

    #[test]
    fn editing_frames_stay_inside_the_row() {
        let metrics = CellMetrics::default();
        let engine = LayoutEngine::new(metrics);
        let widest = measure::max_bubble_width(CELL_WIDTH, &metrics);

        for direction in [Direction::ToMe, Direction::FromMe] {
            for width in [20., 150., widest, CELL_WIDTH + 100.] {
                let geometry = engine.layout_content(&input(direction, Size::new(width, 60.), true));
                let selection = geometry.selection.expect("selection slot while editing");

                for frame in [
                    selection,
                    geometry.avatar,
                    geometry.bubble,
                    geometry.content,
                    geometry.status,
                ] {
                    assert!(frame.min_x() >= 0., "{direction:?} {width}: {frame:?}");
                    assert!(frame.max_x() <= CELL_WIDTH, "{direction:?} {width}: {frame:?}");
                }
                assert!(!geometry.avatar.intersects(&selection));
                assert!(!geometry.status.intersects(&selection));
                if width <= widest {
                    assert!(!geometry.bubble.intersects(&selection));
                }
            }
        }
    }

    #[test]
    fn degenerate_inputs_clamp_to_zero() {
        let engine = LayoutEngine::new(CellMetrics::default());
        for direction in [Direction::ToMe, Direction::FromMe] {
            for cell_width in [0., 20., -50.] {
                let geometry = engine.layout_content(&LayoutInput {
                    direction,
                    cell_width,
                    bubble_size: Size::ZERO,
                    is_editing: false,
                });
                for frame in [geometry.avatar, geometry.bubble, geometry.content, geometry.status] {
                    assert!(frame.size.width >= 0. && frame.size.height >= 0.);
                    assert!(frame.origin.x >= 0. && frame.origin.y >= 0.);
                }
                assert!(!geometry.bubble.intersects(&geometry.avatar));
                assert!(geometry.total_height >= 45. + 20.);
            }
        }
    }

    #[test]
    fn content_frame_translates_into_window() {
        let engine = LayoutEngine::new(CellMetrics::default());
        let geometry = engine.layout_content(&input(Direction::ToMe, Size::new(100., 60.), false));
        let window = engine.content_frame_in_window(&geometry, Point::new(0., 400.));
        assert_eq!(window.size, geometry.content.size);
        assert_eq!(window.min_y(), geometry.content.min_y() + 400.);
    }
}
