use std::rc::Weak;

use tokio::sync::mpsc;

use crate::error::{CellResult, DelegateGoneSnafu};
use crate::gesture::{ContentView, GestureEvent};
use crate::menu::MenuAction;
use crate::model::MessageId;

/// A content event tagged with the message it originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellEvent {
    pub message_id: MessageId,
    pub event: GestureEvent,
}

/// Capabilities a transcript offers its cells. Every method is optional.
///
/// Calls are best-effort notifications: a cell never retries or queues them.
pub trait CellDelegate {
    fn content_event(&self, _event: CellEvent) {}

    /// Decides whether a finished long press opens the action menu.
    fn should_show_menu(&self, _message_id: MessageId, _view: ContentView) -> bool {
        false
    }

    fn menu_action(&self, _message_id: MessageId, _action: MenuAction) {}

    fn selection_toggled(&self, _message_id: MessageId, _is_selected: bool) {}

    fn retry_requested(&self, _message_id: MessageId) {}
}

/// Weak handle to the delegate; every call checks liveness first.
#[derive(Default)]
pub(crate) struct DelegateSlot {
    delegate: Option<Weak<dyn CellDelegate>>,
}

impl DelegateSlot {
    pub(crate) fn set(&mut self, delegate: Weak<dyn CellDelegate>) {
        self.delegate = Some(delegate);
    }

    pub(crate) fn clear(&mut self) {
        self.delegate = None;
    }

    pub(crate) fn with<R>(
        &self,
        event: &'static str,
        call: impl FnOnce(&dyn CellDelegate) -> R,
    ) -> CellResult<R> {
        let Some(delegate) = self.delegate.as_ref().and_then(Weak::upgrade) else {
            return DelegateGoneSnafu {
                stage: "dispatch-delegate",
                event,
            }
            .fail();
        };
        Ok(call(&*delegate))
    }
}

/// Delegate traffic as plain values, for hosts that prefer a channel over callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegateMessage {
    Content(CellEvent),
    MenuAction {
        message_id: MessageId,
        action: MenuAction,
    },
    SelectionToggled {
        message_id: MessageId,
        is_selected: bool,
    },
    RetryRequested {
        message_id: MessageId,
    },
}

/// Forwards every delegate call into an unbounded channel.
pub struct ChannelDelegate {
    sender: mpsc::UnboundedSender<DelegateMessage>,
    menu_on_long_press: bool,
}

impl ChannelDelegate {
    pub fn new(menu_on_long_press: bool) -> (Self, mpsc::UnboundedReceiver<DelegateMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender,
                menu_on_long_press,
            },
            receiver,
        )
    }

    fn send(&self, message: DelegateMessage) {
        if self.sender.send(message).is_err() {
            tracing::debug!("delegate channel closed, dropping message");
        }
    }
}

impl CellDelegate for ChannelDelegate {
    fn content_event(&self, event: CellEvent) {
        self.send(DelegateMessage::Content(event));
    }

    fn should_show_menu(&self, _message_id: MessageId, _view: ContentView) -> bool {
        self.menu_on_long_press
    }

    fn menu_action(&self, message_id: MessageId, action: MenuAction) {
        self.send(DelegateMessage::MenuAction { message_id, action });
    }

    fn selection_toggled(&self, message_id: MessageId, is_selected: bool) {
        self.send(DelegateMessage::SelectionToggled {
            message_id,
            is_selected,
        });
    }

    fn retry_requested(&self, message_id: MessageId) {
        self.send(DelegateMessage::RetryRequested { message_id });
    }
}
