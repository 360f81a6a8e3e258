use std::rc::Weak;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{CellConfig, CellMetrics};
use crate::delegate::{CellDelegate, CellEvent, DelegateSlot};
use crate::edit_mode::EditModeBroadcast;
use crate::error::{CellResult, MenuUnavailableSnafu, UnboundSnafu};
use crate::geometry::{Point, Rect, Size};
use crate::gesture::{ContentView, GestureEvent, GesturePhase, GestureRouter};
use crate::layout::{CellGeometry, LayoutEngine, LayoutInput};
use crate::measure;
use crate::menu::{ActionMenuController, MenuAction, PresentedMenu};
use crate::model::{ContentKind, Direction, MessageModel, layout_hash};
use crate::state::{EditTransition, ThumbnailReady, TransferIndicator, VisualState, VisualStateController};

/// One reusable transcript row.
///
/// Content-specific behavior is picked from the bound message's [`ContentKind`]; there
/// is no per-kind cell type.
pub struct MessageCell {
    config: Arc<CellConfig>,
    layout_engine: LayoutEngine,
    edit_mode: EditModeBroadcast,
    applied_edit_generation: Option<u64>,
    delegate: DelegateSlot,
    model: Option<Arc<MessageModel>>,
    visual: VisualStateController,
    gestures: GestureRouter,
    menu: ActionMenuController,
    /// Set once a finished long press was approved for a menu by the delegate.
    menu_armed: Option<ContentView>,
    geometry: Option<CellGeometry>,
    cell_width: f32,
    is_displayed: bool,
    is_scrolling: bool,
}

impl MessageCell {
    pub fn new(config: Arc<CellConfig>, edit_mode: EditModeBroadcast) -> Self {
        Self {
            layout_engine: LayoutEngine::new(config.metrics),
            gestures: GestureRouter::new(config.long_press_threshold(), config.tap_slop),
            config,
            edit_mode,
            applied_edit_generation: None,
            delegate: DelegateSlot::default(),
            model: None,
            visual: VisualStateController::new(),
            menu: ActionMenuController::new(),
            menu_armed: None,
            geometry: None,
            cell_width: 0.,
            is_displayed: false,
            is_scrolling: false,
        }
    }

    /// Row height for `model`; pure and safe to call off the interaction thread.
    pub fn height_for_model(model: &MessageModel, max_content_width: f32, metrics: &CellMetrics) -> f32 {
        measure::height_for_model(model, max_content_width, metrics)
    }

    pub fn set_delegate(&mut self, delegate: Weak<dyn CellDelegate>) {
        self.delegate.set(delegate);
    }

    pub fn clear_delegate(&mut self) {
        self.delegate.clear();
    }

    /// Binds a new message, resetting every piece of transient state.
    pub fn bind(&mut self, model: Arc<MessageModel>) {
        tracing::debug!(
            message_id = model.id.0,
            previous = ?self.model.as_ref().map(|bound| bound.id.0),
            "binding message cell"
        );
        self.prepare_for_use(model.is_from_me());
        self.visual.select_bubble_for(&model);
        self.visual.load_thumbnail_from(&model);
        self.model = Some(model);
        self.update_upload_status();
        self.update_download_status();
    }

    /// Replaces the snapshot of the bound message without resetting display state.
    ///
    /// A snapshot for a different message is treated as a full [`Self::bind`].
    pub fn refresh(&mut self, model: Arc<MessageModel>) {
        let Some(bound) = self.model.as_ref().filter(|bound| bound.id == model.id) else {
            self.bind(model);
            return;
        };

        if layout_hash(bound) != layout_hash(&model) {
            self.geometry = None;
        }
        self.visual.select_bubble_for(&model);
        if self.visual.state().thumbnail.is_none() {
            self.visual.load_thumbnail_from(&model);
        }
        self.model = Some(model);
        self.update_upload_status();
        self.update_download_status();
    }

    /// Resets display flags and picks the from-me or to-me variant.
    pub fn prepare_for_use(&mut self, is_from_me: bool) {
        self.cancel_content_touch();
        self.dismiss_menu();
        let _ = self.gestures.set_editing(false);
        self.visual.prepare_for_use(is_from_me);
        self.applied_edit_generation = None;
        self.geometry = None;
    }

    /// Applies the transcript-wide edit mode to this cell.
    ///
    /// Any in-flight touch is cancelled before the selection slot is inserted.
    /// Returns `false` when the cell already matched.
    pub fn set_cell_editing_animated(&mut self, animated: bool) -> bool {
        let mode = self.edit_mode.snapshot();
        self.applied_edit_generation = Some(mode.generation);
        if self.visual.state().is_editing == mode.is_editing {
            return false;
        }

        if let Some(event) = self.gestures.set_editing(mode.is_editing) {
            self.dispatch_gesture(event);
        }
        self.dismiss_menu();
        self.visual.set_editing(
            mode.is_editing,
            animated,
            self.config.metrics.edit_control_size,
        );
        self.geometry = None;
        true
    }

    pub fn take_edit_transition(&mut self) -> Option<EditTransition> {
        self.visual.take_transition()
    }

    pub fn will_display_cell(&mut self) {
        self.is_displayed = true;
        self.sync_edit_mode(false);
        self.update_upload_status();
        self.update_download_status();
    }

    pub fn did_end_displaying_cell(&mut self) {
        self.is_displayed = false;
        self.cancel_content_touch();
        self.dismiss_menu();
    }

    /// The list took over the touch stream; the in-flight session is cancelled once.
    pub fn will_begin_scrolling(&mut self) {
        self.is_scrolling = true;
        self.cancel_content_touch();
        self.dismiss_menu();
    }

    pub fn did_end_scrolling(&mut self) {
        self.is_scrolling = false;
    }

    pub fn update_upload_status(&mut self) {
        if let Some(model) = self.model.as_ref() {
            self.visual.update_upload_status(model);
        }
    }

    pub fn update_download_status(&mut self) {
        if let Some(model) = self.model.as_ref() {
            self.visual.update_download_status(model);
        }
    }

    /// Applies a pipeline completion. Completions for a previous binding are dropped.
    pub fn update_thumbnail(&mut self, ready: ThumbnailReady) -> bool {
        match self.visual.update_thumbnail(self.model.as_deref(), ready) {
            Ok(()) => true,
            Err(error) => {
                tracing::debug!(%error, "discarding thumbnail");
                false
            }
        }
    }

    /// Lays out every frame for a row of `cell_width`.
    pub fn layout(&mut self, cell_width: f32) -> CellGeometry {
        self.cell_width = cell_width;
        let is_from_me = self.model.as_ref().is_some_and(|model| model.is_from_me());
        self.layout_content(is_from_me);
        self.layout_status_views(is_from_me)
    }

    pub fn layout_content(&mut self, is_from_me: bool) -> CellGeometry {
        self.sync_edit_mode(false);
        let input = self.layout_input(is_from_me);
        let geometry = self.layout_engine.layout_content(&input);
        self.geometry = Some(geometry);
        geometry
    }

    pub fn layout_status_views(&mut self, is_from_me: bool) -> CellGeometry {
        let input = self.layout_input(is_from_me);
        let geometry = match self.geometry.as_mut() {
            Some(geometry) => {
                self.layout_engine.layout_status_views(geometry, &input);
                *geometry
            }
            None => self.layout_engine.layout_content(&input),
        };
        self.geometry = Some(geometry);
        geometry
    }

    /// Content frame in window coordinates, given where the host placed this row.
    pub fn content_frame_in_window(&self, cell_origin: Point) -> Option<Rect> {
        self.geometry
            .as_ref()
            .map(|geometry| self.layout_engine.content_frame_in_window(geometry, cell_origin))
    }

    /// Classifies a cell-local point as tappable content or pass-through.
    pub fn hit_test(&self, point: Point) -> Option<ContentView> {
        let geometry = self.geometry.as_ref()?;
        let model = self.model.as_ref()?;

        match model.kind() {
            ContentKind::Text | ContentKind::Unsupported => geometry
                .visible_bubble(&self.config.metrics)
                .contains(point)
                .then_some(ContentView::Bubble),
            ContentKind::Image | ContentKind::Audio | ContentKind::Video | ContentKind::File => {
                geometry.content.contains(point).then_some(ContentView::Media)
            }
        }
    }

    pub fn touch_began(&mut self, point: Point, at: Instant) -> Vec<GestureEvent> {
        if self.is_scrolling || self.model.is_none() {
            return Vec::new();
        }
        // Touching anywhere dismisses an open menu.
        self.dismiss_menu();

        let hit = self.hit_test(point);
        let events = self.gestures.touch_began(point, at, hit);
        self.dispatch_all(events)
    }

    pub fn touch_moved(&mut self, point: Point) -> Vec<GestureEvent> {
        let hit = self.hit_test(point);
        let event = self.gestures.touch_moved(point, hit);
        self.dispatch_all(event.into_iter().collect())
    }

    pub fn touch_ended(&mut self, at: Instant) -> Vec<GestureEvent> {
        let events = self.gestures.touch_ended(at);
        self.dispatch_all(events)
    }

    /// Host-side timer callback for the long-press threshold.
    pub fn poll_long_press(&mut self, now: Instant) -> Vec<GestureEvent> {
        let event = self.gestures.poll_long_press(now);
        self.dispatch_all(event.into_iter().collect())
    }

    pub fn long_press_deadline(&self) -> Option<Instant> {
        self.gestures.long_press_deadline()
    }

    /// Cancels the in-flight content touch, if any. Idempotent.
    pub fn cancel_content_touch(&mut self) -> Vec<GestureEvent> {
        let event = self.gestures.cancel();
        self.dispatch_all(event.into_iter().collect())
    }

    /// Presents the action menu anchored at `rect`.
    ///
    /// Only succeeds after a long press on `view` ended and the delegate asked for a
    /// menu. Presenting again replaces the open menu.
    pub fn show_menu(&mut self, rect: Rect, view: ContentView) -> bool {
        match self.try_show_menu(rect, view) {
            Ok(()) => true,
            Err(error) => {
                tracing::debug!(%error, "menu not shown");
                false
            }
        }
    }

    /// Dispatches the chosen action to the delegate and closes the menu.
    pub fn choose_menu_action(&mut self, action: MenuAction) -> bool {
        self.menu_armed = None;
        match self.menu.choose(action) {
            Ok((message_id, action)) => {
                self.notify("menu-action", |delegate| delegate.menu_action(message_id, action));
                true
            }
            Err(error) => {
                tracing::debug!(%error, action = action.as_str(), "menu action dropped");
                false
            }
        }
    }

    pub fn dismiss_menu(&mut self) -> bool {
        self.menu_armed = None;
        self.menu.dismiss()
    }

    /// Retry affordance beside the bubble was tapped.
    pub fn tap_status_button(&mut self) -> bool {
        let Some(message_id) = self.model.as_ref().map(|model| model.id) else {
            return false;
        };
        if self.visual.state().status_indicator() != TransferIndicator::Retry {
            return false;
        }
        self.notify("retry-requested", |delegate| delegate.retry_requested(message_id));
        true
    }

    pub fn model(&self) -> Option<&Arc<MessageModel>> {
        self.model.as_ref()
    }

    pub fn visual_state(&self) -> &VisualState {
        self.visual.state()
    }

    pub fn geometry(&self) -> Option<&CellGeometry> {
        self.geometry.as_ref()
    }

    pub fn presented_menu(&self) -> Option<&PresentedMenu> {
        self.menu.presented()
    }

    pub fn gesture_phase(&self) -> GesturePhase {
        self.gestures.phase()
    }

    pub fn is_displayed(&self) -> bool {
        self.is_displayed
    }

    pub fn is_scrolling(&self) -> bool {
        self.is_scrolling
    }

    fn sync_edit_mode(&mut self, animated: bool) {
        let generation = self.edit_mode.snapshot().generation;
        if self.applied_edit_generation != Some(generation) {
            self.set_cell_editing_animated(animated);
        }
    }

    fn layout_input(&self, is_from_me: bool) -> LayoutInput {
        let bubble_size = self
            .model
            .as_ref()
            .map(|model| measure::bubble_size(model, self.cell_width, &self.config.metrics))
            .unwrap_or(Size::ZERO);

        LayoutInput {
            direction: Direction::from_flag(is_from_me),
            cell_width: self.cell_width,
            bubble_size,
            is_editing: self.visual.state().is_editing,
        }
    }

    fn try_show_menu(&mut self, rect: Rect, view: ContentView) -> CellResult<()> {
        if self.menu_armed != Some(view) {
            return MenuUnavailableSnafu {
                stage: "show-menu",
                details: "no approved long press on this view",
            }
            .fail();
        }
        let Some(model) = self.model.as_ref() else {
            return UnboundSnafu { stage: "show-menu" }.fail();
        };

        self.menu.show(rect, view, model)?;
        Ok(())
    }

    fn dispatch_all(&mut self, events: Vec<GestureEvent>) -> Vec<GestureEvent> {
        for event in &events {
            self.dispatch_gesture(*event);
        }
        events
    }

    fn dispatch_gesture(&mut self, event: GestureEvent) {
        let Some(message_id) = self.model.as_ref().map(|model| model.id) else {
            return;
        };

        match event {
            GestureEvent::TouchBegan(_) => self.visual.set_highlighted(true),
            GestureEvent::Cancelled(_)
            | GestureEvent::Tapped(_)
            | GestureEvent::LongPressEnded(_) => {
                self.visual.set_highlighted(false)
            }
            GestureEvent::LongPressBegan(_) => {}
            GestureEvent::SelectionToggled => {
                if let Some(is_selected) = self.visual.toggle_selected() {
                    self.notify("selection-toggled", |delegate| {
                        delegate.selection_toggled(message_id, is_selected)
                    });
                }
                return;
            }
        }

        self.notify(event.name(), |delegate| {
            delegate.content_event(CellEvent { message_id, event })
        });

        if let GestureEvent::LongPressEnded(view) = event {
            self.resolve_long_press(view);
        }
    }

    fn resolve_long_press(&mut self, view: ContentView) {
        let Some(message_id) = self.model.as_ref().map(|model| model.id) else {
            return;
        };
        let wants_menu = self
            .delegate
            .with("should-show-menu", |delegate| {
                delegate.should_show_menu(message_id, view)
            })
            .unwrap_or_else(|error| {
                tracing::debug!(%error, "no menu decision");
                false
            });
        if !wants_menu {
            return;
        }

        self.menu_armed = Some(view);
        let anchor = self
            .geometry
            .map(|geometry| geometry.content)
            .unwrap_or(Rect::ZERO);
        self.show_menu(anchor, view);
    }

    fn notify(&self, event: &'static str, call: impl FnOnce(&dyn CellDelegate)) {
        if let Err(error) = self.delegate.with(event, call) {
            tracing::debug!(%error, "dropping delegate notification");
        }
    }
}
