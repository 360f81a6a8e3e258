use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CellResult, MenuUnavailableSnafu};
use crate::geometry::Rect;
use crate::gesture::ContentView;
use crate::model::{ContentKind, DeliveryStatus, DownloadStatus, MessageId, MessageModel};

/// Stable identifier of a contextual action.
///
/// Handlers match on this, never on menu position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MenuAction {
    Copy,
    Forward,
    Favorite,
    Translate,
    Delete,
    More,
    AddToEmoji,
    ShowAlbum,
    SaveToAlbum,
    Play,
    TranslateToWords,
}

impl MenuAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Forward => "forward",
            Self::Favorite => "favorite",
            Self::Translate => "translate",
            Self::Delete => "delete",
            Self::More => "more",
            Self::AddToEmoji => "add-to-emoji",
            Self::ShowAlbum => "show-album",
            Self::SaveToAlbum => "save-to-album",
            Self::Play => "play",
            Self::TranslateToWords => "translate-to-words",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Copy => "Copy",
            Self::Forward => "Forward",
            Self::Favorite => "Favorite",
            Self::Translate => "Translate",
            Self::Delete => "Delete",
            Self::More => "More...",
            Self::AddToEmoji => "Add to Stickers",
            Self::ShowAlbum => "Album",
            Self::SaveToAlbum => "Save to Album",
            Self::Play => "Play",
            Self::TranslateToWords => "Convert to Text",
        }
    }
}

impl fmt::Display for MenuAction {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub action: MenuAction,
    pub label: &'static str,
}

impl From<MenuAction> for MenuItem {
    fn from(action: MenuAction) -> Self {
        Self {
            action,
            label: action.label(),
        }
    }
}

/// Ordered menu contents for one presentation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MenuSpec {
    pub items: Vec<MenuItem>,
}

impl MenuSpec {
    pub fn contains(&self, action: MenuAction) -> bool {
        self.items.iter().any(|item| item.action == action)
    }

    pub fn actions(&self) -> Vec<MenuAction> {
        self.items.iter().map(|item| item.action).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Builds the menu for the message as it is right now.
pub fn build_menu(model: &MessageModel) -> MenuSpec {
    let delivered = !model.is_from_me() || model.delivery == DeliveryStatus::Sent;
    let downloaded = model.download == DownloadStatus::Succeeded;

    let mut actions = Vec::with_capacity(7);
    match model.kind() {
        ContentKind::Text => {
            actions.push(MenuAction::Copy);
            push_if(&mut actions, delivered, MenuAction::Forward);
            push_if(&mut actions, delivered, MenuAction::Favorite);
            actions.push(MenuAction::Translate);
        }
        ContentKind::Image => {
            push_if(&mut actions, delivered, MenuAction::Forward);
            push_if(&mut actions, delivered, MenuAction::Favorite);
            push_if(&mut actions, downloaded, MenuAction::AddToEmoji);
            push_if(&mut actions, downloaded, MenuAction::SaveToAlbum);
            actions.push(MenuAction::ShowAlbum);
        }
        ContentKind::Video => {
            push_if(&mut actions, delivered, MenuAction::Forward);
            push_if(&mut actions, delivered, MenuAction::Favorite);
            push_if(&mut actions, downloaded, MenuAction::SaveToAlbum);
            actions.push(MenuAction::ShowAlbum);
        }
        ContentKind::Audio => {
            actions.push(MenuAction::Play);
            push_if(&mut actions, delivered, MenuAction::Favorite);
            actions.push(MenuAction::TranslateToWords);
        }
        ContentKind::File => {
            push_if(&mut actions, delivered, MenuAction::Forward);
            push_if(&mut actions, delivered, MenuAction::Favorite);
        }
        ContentKind::Unsupported => {}
    }

    actions.push(MenuAction::Delete);
    if model.kind() != ContentKind::Unsupported {
        actions.push(MenuAction::More);
    }

    MenuSpec {
        items: actions.into_iter().map(MenuItem::from).collect(),
    }
}

fn push_if(actions: &mut Vec<MenuAction>, condition: bool, action: MenuAction) {
    if condition {
        actions.push(action);
    }
}

/// A menu currently on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentedMenu {
    pub message_id: MessageId,
    pub anchor: Rect,
    pub view: ContentView,
    pub spec: MenuSpec,
}

#[derive(Debug, Default)]
pub struct ActionMenuController {
    presented: Option<PresentedMenu>,
}

impl ActionMenuController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presented(&self) -> Option<&PresentedMenu> {
        self.presented.as_ref()
    }

    pub fn is_presented(&self) -> bool {
        self.presented.is_some()
    }

    /// Presents a freshly built menu, replacing any open one.
    pub fn show(
        &mut self,
        anchor: Rect,
        view: ContentView,
        model: &MessageModel,
    ) -> CellResult<&PresentedMenu> {
        let spec = build_menu(model);
        if spec.is_empty() {
            return MenuUnavailableSnafu {
                stage: "build-menu",
                details: "no actions for this message",
            }
            .fail();
        }

        if self.presented.is_some() {
            tracing::debug!(message_id = model.id.0, "replacing open menu");
        }
        Ok(&*self.presented.insert(PresentedMenu {
            message_id: model.id,
            anchor,
            view,
            spec,
        }))
    }

    /// Closes the menu and returns the chosen action for dispatch.
    ///
    /// Presentation state is cleared even when the action is not on the menu.
    pub fn choose(&mut self, action: MenuAction) -> CellResult<(MessageId, MenuAction)> {
        let Some(presented) = self.presented.take() else {
            return MenuUnavailableSnafu {
                stage: "choose-menu-action",
                details: "no menu is presented",
            }
            .fail();
        };

        if !presented.spec.contains(action) {
            return MenuUnavailableSnafu {
                stage: "choose-menu-action",
                details: "action is not on the presented menu",
            }
            .fail();
        }

        Ok((presented.message_id, action))
    }

    pub fn dismiss(&mut self) -> bool {
        self.presented.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, MessageContent, PixelSize};

    fn image(download: DownloadStatus) -> MessageModel {
        MessageModel::image(MessageId::new(1), Direction::ToMe, PixelSize::new(100, 100))
            .with_download(download)
    }

    #[test]
    fn text_menu_offers_copy_and_translate() {
        let model = MessageModel::text(MessageId::new(1), Direction::ToMe, "hola");
        assert_eq!(
            build_menu(&model).actions(),
            vec![
                MenuAction::Copy,
                MenuAction::Forward,
                MenuAction::Favorite,
                MenuAction::Translate,
                MenuAction::Delete,
                MenuAction::More,
            ]
        );
    }

    #[test]
    fn save_to_album_requires_completed_download() {
        assert!(!build_menu(&image(DownloadStatus::Downloading)).contains(MenuAction::SaveToAlbum));
        assert!(!build_menu(&image(DownloadStatus::Failed)).contains(MenuAction::SaveToAlbum));
        let done = build_menu(&image(DownloadStatus::Succeeded));
        assert!(done.contains(MenuAction::SaveToAlbum));
        assert!(done.contains(MenuAction::AddToEmoji));
    }

    #[test]
    fn undelivered_messages_cannot_be_forwarded() {
        let failed = MessageModel::text(MessageId::new(2), Direction::FromMe, "oops")
            .with_delivery(DeliveryStatus::Failed);
        let menu = build_menu(&failed);
        assert!(!menu.contains(MenuAction::Forward));
        assert!(menu.contains(MenuAction::Delete));
    }

    #[test]
    fn audio_and_unsupported_menus() {
        let audio = MessageModel::new(
            MessageId::new(3),
            Direction::ToMe,
            MessageContent::Audio { duration_secs: 4. },
        );
        let menu = build_menu(&audio);
        assert_eq!(menu.items[0].action, MenuAction::Play);
        assert!(menu.contains(MenuAction::TranslateToWords));

        let unsupported = MessageModel::new(MessageId::new(4), Direction::ToMe, MessageContent::Unsupported);
        assert_eq!(build_menu(&unsupported).actions(), vec![MenuAction::Delete]);
    }

    #[test]
    fn identifiers_are_stable_strings() {
        assert_eq!(MenuAction::AddToEmoji.as_str(), "add-to-emoji");
        assert_eq!(
            serde_json::to_string(&MenuAction::TranslateToWords).expect("serialize"),
            "\"translate-to-words\""
        );
        let parsed: MenuAction = serde_json::from_str("\"show-album\"").expect("deserialize");
        assert_eq!(parsed, MenuAction::ShowAlbum);
    }

    #[test]
    fn showing_again_replaces_and_choosing_clears() {
        let mut controller = ActionMenuController::new();
        let first = MessageModel::text(MessageId::new(5), Direction::ToMe, "first");
        let second = MessageModel::text(MessageId::new(6), Direction::ToMe, "second");

        controller
            .show(Rect::new(0., 0., 10., 10.), ContentView::Bubble, &first)
            .expect("menu shown");
        controller
            .show(Rect::new(0., 50., 10., 10.), ContentView::Bubble, &second)
            .expect("menu replaced");
        assert_eq!(controller.presented().map(|menu| menu.message_id), Some(second.id));

        assert_eq!(
            controller.choose(MenuAction::Copy).expect("copy is on the menu"),
            (second.id, MenuAction::Copy)
        );
        assert!(!controller.is_presented());
        assert!(controller.choose(MenuAction::Copy).is_err());
    }

    #[test]
    fn choosing_an_absent_action_still_dismisses() {
        let mut controller = ActionMenuController::new();
        let pending = image(DownloadStatus::Downloading);
        controller
            .show(Rect::ZERO, ContentView::Media, &pending)
            .expect("menu shown");
        assert!(controller.choose(MenuAction::SaveToAlbum).is_err());
        assert!(!controller.is_presented());
        assert!(!controller.dismiss());
    }
}
