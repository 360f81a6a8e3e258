//! Touch classification for one cell.
//!
//! A session lives from touch-down to its single terminal outcome:
//!
//! ```text
//! Idle -> TouchBegan -> Tapped                          -> Idle
//!                    -> LongPressing -> LongPressEnded  -> Idle
//!         TouchBegan | LongPressing -> Cancelled        -> Idle
//! ```
//!
//! A touch-down that arrives while a session is still open cancels that session
//! first, so every `TouchBegan` is closed by exactly one terminal event.
//!
//! ```text
//! TouchBegan -> touch-down -> Cancelled, TouchBegan     -> ...
//! ```
//!
//! The router never blocks on time. The host polls [`GestureRouter::poll_long_press`]
//! at [`GestureRouter::long_press_deadline`].

use std::time::{Duration, Instant};

use crate::geometry::Point;

/// Sub-view a touch landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentView {
    /// Text bubble body.
    Bubble,
    /// Thumbnail, audio strip or file card.
    Media,
}

/// Semantic result of raw touch input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureEvent {
    TouchBegan(ContentView),
    Cancelled(ContentView),
    Tapped(ContentView),
    LongPressBegan(ContentView),
    LongPressEnded(ContentView),
    /// Edit-mode replacement for every content gesture.
    SelectionToggled,
}

impl GestureEvent {
    /// Terminal events close a session; at most one fires per touch-down.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Cancelled(_)
                | Self::Tapped(_)
                | Self::LongPressEnded(_)
                | Self::SelectionToggled
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TouchBegan(_) => "touch-began",
            Self::Cancelled(_) => "touch-cancelled",
            Self::Tapped(_) => "tapped",
            Self::LongPressBegan(_) => "long-press-began",
            Self::LongPressEnded(_) => "long-press-ended",
            Self::SelectionToggled => "selection-toggled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    TouchBegan,
    LongPressing,
    /// Edit-mode touch waiting for release.
    Toggling,
}

#[derive(Debug, Clone, Copy)]
struct GestureSession {
    view: Option<ContentView>,
    origin: Point,
    started_at: Instant,
    phase: GesturePhase,
}

#[derive(Debug)]
pub struct GestureRouter {
    long_press_threshold: Duration,
    tap_slop: f32,
    is_editing: bool,
    session: Option<GestureSession>,
}

impl GestureRouter {
    pub fn new(long_press_threshold: Duration, tap_slop: f32) -> Self {
        Self {
            long_press_threshold,
            tap_slop,
            is_editing: false,
            session: None,
        }
    }

    pub fn phase(&self) -> GesturePhase {
        self.session
            .map(|session| session.phase)
            .unwrap_or(GesturePhase::Idle)
    }

    pub fn is_idle(&self) -> bool {
        self.session.is_none()
    }

    /// Switches between content gestures and the edit-mode selection toggle.
    ///
    /// Any in-flight session is cancelled first.
    pub fn set_editing(&mut self, is_editing: bool) -> Option<GestureEvent> {
        if self.is_editing == is_editing {
            return None;
        }
        let cancelled = self.cancel();
        self.is_editing = is_editing;
        cancelled
    }

    /// When the pending long press should be checked, if one is pending.
    pub fn long_press_deadline(&self) -> Option<Instant> {
        self.session
            .filter(|session| session.phase == GesturePhase::TouchBegan)
            .map(|session| session.started_at + self.long_press_threshold)
    }

    /// Starts a session. `hit` is `None` for touches outside the content region.
    ///
    /// Outside touches pass through to the container untouched, except in edit mode
    /// where the whole cell toggles selection.
    ///
    /// A session left open by a missing release is cancelled first, and its
    /// `Cancelled` leads the returned events.
    pub fn touch_began(
        &mut self,
        point: Point,
        at: Instant,
        hit: Option<ContentView>,
    ) -> Vec<GestureEvent> {
        let mut events = self.cancel().into_iter().collect::<Vec<_>>();

        if self.is_editing {
            self.session = Some(GestureSession {
                view: hit,
                origin: point,
                started_at: at,
                phase: GesturePhase::Toggling,
            });
            return events;
        }

        if let Some(view) = hit {
            self.session = Some(GestureSession {
                view: Some(view),
                origin: point,
                started_at: at,
                phase: GesturePhase::TouchBegan,
            });
            events.push(GestureEvent::TouchBegan(view));
        }
        events
    }

    /// Tracks movement; leaving the content region or exceeding the slop cancels.
    pub fn touch_moved(&mut self, point: Point, hit: Option<ContentView>) -> Option<GestureEvent> {
        let session = self.session?;
        let travelled = session.origin.distance_to(point) > self.tap_slop;

        let cancels = match session.phase {
            GesturePhase::Idle => false,
            GesturePhase::TouchBegan => travelled || hit != session.view,
            GesturePhase::LongPressing => hit != session.view,
            GesturePhase::Toggling => travelled,
        };

        if cancels { self.cancel() } else { None }
    }

    /// Fires the long-press once the threshold has elapsed.
    pub fn poll_long_press(&mut self, now: Instant) -> Option<GestureEvent> {
        let session = self.session.as_mut()?;
        if session.phase != GesturePhase::TouchBegan {
            return None;
        }
        if now.saturating_duration_since(session.started_at) < self.long_press_threshold {
            return None;
        }

        session.phase = GesturePhase::LongPressing;
        session.view.map(GestureEvent::LongPressBegan)
    }

    /// Resolves the session on release.
    ///
    /// A release after the threshold whose timer was never polled still resolves as a
    /// long press, so the returned events are `LongPressBegan` then `LongPressEnded`.
    pub fn touch_ended(&mut self, at: Instant) -> Vec<GestureEvent> {
        let Some(session) = self.session.take() else {
            return Vec::new();
        };

        match (session.phase, session.view) {
            (GesturePhase::Toggling, _) => vec![GestureEvent::SelectionToggled],
            (GesturePhase::TouchBegan, Some(view)) => {
                let held = at.saturating_duration_since(session.started_at);
                if held < self.long_press_threshold {
                    vec![GestureEvent::Tapped(view)]
                } else {
                    vec![
                        GestureEvent::LongPressBegan(view),
                        GestureEvent::LongPressEnded(view),
                    ]
                }
            }
            (GesturePhase::LongPressing, Some(view)) => vec![GestureEvent::LongPressEnded(view)],
            _ => Vec::new(),
        }
    }

    /// Drops the in-flight session. Returns `Cancelled` only for a content session;
    /// cancelling an idle router is a no-op.
    pub fn cancel(&mut self) -> Option<GestureEvent> {
        let session = self.session.take()?;
        match session.phase {
            GesturePhase::TouchBegan | GesturePhase::LongPressing => {
                tracing::debug!(phase = ?session.phase, "content gesture cancelled");
                session.view.map(GestureEvent::Cancelled)
            }
            GesturePhase::Idle | GesturePhase::Toggling => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: Duration = Duration::from_millis(500);

    fn router() -> GestureRouter {
        GestureRouter::new(THRESHOLD, 10.)
    }

    fn terminal_count(events: &[GestureEvent]) -> usize {
        events.iter().filter(|event| event.is_terminal()).count()
    }

    #[test]
    fn quick_release_is_a_tap() {
        let mut router = router();
        let start = Instant::now();
        let began = router.touch_began(Point::new(5., 5.), start, Some(ContentView::Bubble));
        assert_eq!(began, vec![GestureEvent::TouchBegan(ContentView::Bubble)]);
        assert_eq!(router.poll_long_press(start + Duration::from_millis(100)), None);

        let ended = router.touch_ended(start + Duration::from_millis(120));
        assert_eq!(ended, vec![GestureEvent::Tapped(ContentView::Bubble)]);
        assert!(router.is_idle());
    }

    #[test]
    fn held_press_resolves_as_long_press_only() {
        let mut router = router();
        let start = Instant::now();
        router.touch_began(Point::new(5., 5.), start, Some(ContentView::Media));
        assert_eq!(router.long_press_deadline(), Some(start + THRESHOLD));

        let began = router.poll_long_press(start + THRESHOLD);
        assert_eq!(began, Some(GestureEvent::LongPressBegan(ContentView::Media)));
        assert_eq!(router.poll_long_press(start + THRESHOLD * 2), None);
        assert_eq!(router.long_press_deadline(), None);

        let ended = router.touch_ended(start + THRESHOLD * 3);
        assert_eq!(ended, vec![GestureEvent::LongPressEnded(ContentView::Media)]);
        assert_eq!(terminal_count(&ended), 1);
    }

    #[test]
    fn late_release_without_poll_is_still_a_long_press() {
        let mut router = router();
        let start = Instant::now();
        router.touch_began(Point::ZERO, start, Some(ContentView::Bubble));
        let events = router.touch_ended(start + THRESHOLD);
        assert_eq!(
            events,
            vec![
                GestureEvent::LongPressBegan(ContentView::Bubble),
                GestureEvent::LongPressEnded(ContentView::Bubble),
            ]
        );
        assert_eq!(terminal_count(&events), 1);
    }

    #[test]
    fn outside_touches_pass_through() {
        let mut router = router();
        let start = Instant::now();
        assert!(router.touch_began(Point::ZERO, start, None).is_empty());
        assert!(router.is_idle());
        assert!(router.touch_ended(start).is_empty());
    }

    #[test]
    fn cancelled_session_never_emits_later() {
        let mut router = router();
        let start = Instant::now();
        router.touch_began(Point::ZERO, start, Some(ContentView::Bubble));

        assert_eq!(router.cancel(), Some(GestureEvent::Cancelled(ContentView::Bubble)));
        assert_eq!(router.cancel(), None);
        assert_eq!(router.poll_long_press(start + THRESHOLD * 2), None);
        assert!(router.touch_ended(start + THRESHOLD * 2).is_empty());
    }

    #[test]
    fn leaving_the_content_region_cancels() {
        let mut router = router();
        let start = Instant::now();
        router.touch_began(Point::ZERO, start, Some(ContentView::Bubble));
        assert_eq!(router.touch_moved(Point::new(2., 2.), Some(ContentView::Bubble)), None);
        assert_eq!(
            router.touch_moved(Point::new(3., 3.), None),
            Some(GestureEvent::Cancelled(ContentView::Bubble))
        );

        router.touch_began(Point::ZERO, start, Some(ContentView::Bubble));
        assert_eq!(
            router.touch_moved(Point::new(40., 0.), Some(ContentView::Bubble)),
            Some(GestureEvent::Cancelled(ContentView::Bubble))
        );
    }

    #[test]
    fn long_press_tolerates_travel_but_not_leaving() {
        let mut router = router();
        let start = Instant::now();
        router.touch_began(Point::ZERO, start, Some(ContentView::Media));
        router.poll_long_press(start + THRESHOLD);

        assert_eq!(router.touch_moved(Point::new(30., 0.), Some(ContentView::Media)), None);
        assert_eq!(router.phase(), GesturePhase::LongPressing);
        assert_eq!(
            router.touch_moved(Point::new(300., 0.), None),
            Some(GestureEvent::Cancelled(ContentView::Media))
        );
        assert!(router.touch_ended(start + THRESHOLD * 2).is_empty());
    }

    #[test]
    fn editing_replaces_content_events_with_toggle() {
        let mut router = router();
        let start = Instant::now();
        router.set_editing(true);

        assert!(
            router
                .touch_began(Point::ZERO, start, Some(ContentView::Bubble))
                .is_empty()
        );
        assert_eq!(router.poll_long_press(start + THRESHOLD * 4), None);
        assert_eq!(
            router.touch_ended(start + THRESHOLD * 4),
            vec![GestureEvent::SelectionToggled]
        );

        // Outside the content region still toggles while editing.
        router.touch_began(Point::ZERO, start, None);
        assert_eq!(router.touch_ended(start), vec![GestureEvent::SelectionToggled]);

        // A drag is a scroll, not a toggle.
        router.touch_began(Point::ZERO, start, None);
        assert_eq!(router.touch_moved(Point::new(0., 50.), None), None);
        assert!(router.touch_ended(start).is_empty());
    }

    #[test]
    fn entering_edit_mode_cancels_in_flight_session() {
        let mut router = router();
        let start = Instant::now();
        router.touch_began(Point::ZERO, start, Some(ContentView::Bubble));
        assert_eq!(
            router.set_editing(true),
            Some(GestureEvent::Cancelled(ContentView::Bubble))
        );
        assert_eq!(router.set_editing(true), None);
        assert!(router.is_idle());
    }

    #[test]
    fn second_touch_down_cancels_the_open_session() {
        let mut router = router();
        let start = Instant::now();
        router.touch_began(Point::ZERO, start, Some(ContentView::Media));

        let events = router.touch_began(Point::new(200., 0.), start, None);
        assert_eq!(events, vec![GestureEvent::Cancelled(ContentView::Media)]);
        assert!(router.is_idle());

        router.touch_began(Point::ZERO, start, Some(ContentView::Bubble));
        let events = router.touch_began(Point::ZERO, start, Some(ContentView::Media));
        assert_eq!(
            events,
            vec![
                GestureEvent::Cancelled(ContentView::Bubble),
                GestureEvent::TouchBegan(ContentView::Media),
            ]
        );
        assert_eq!(terminal_count(&events), 1);
    }
}
