use crate::error::{CellResult, StaleBindingSnafu};
use crate::model::{
    ContentKind, DeliveryStatus, DownloadStatus, MessageId, MessageModel, ThumbnailRef,
};

/// What the status slot beside the bubble shows. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransferIndicator {
    #[default]
    Hidden,
    Spinner,
    Retry,
}

/// Bubble artwork selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BubbleVariant {
    Sender,
    Receiver,
}

impl BubbleVariant {
    pub fn for_direction(is_from_me: bool) -> Self {
        if is_from_me { Self::Sender } else { Self::Receiver }
    }
}

/// Artwork drawn behind the bound content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BubbleAsset {
    /// Stretchable background for text-like content, with a pressed version.
    TextBackground {
        variant: BubbleVariant,
        highlighted: bool,
    },
    /// Frame around a thumbnail. The thumbnail is clipped by the matching mask and
    /// has no pressed version.
    ImageBorder { variant: BubbleVariant },
}

impl BubbleAsset {
    pub fn select(variant: BubbleVariant, kind: ContentKind, highlighted: bool) -> Self {
        if kind.has_thumbnail() {
            Self::ImageBorder { variant }
        } else {
            Self::TextBackground {
                variant,
                highlighted,
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TextBackground {
                variant: BubbleVariant::Sender,
                highlighted: false,
            } => "sender-text",
            Self::TextBackground {
                variant: BubbleVariant::Sender,
                highlighted: true,
            } => "sender-text-highlighted",
            Self::TextBackground {
                variant: BubbleVariant::Receiver,
                highlighted: false,
            } => "receiver-text",
            Self::TextBackground {
                variant: BubbleVariant::Receiver,
                highlighted: true,
            } => "receiver-text-highlighted",
            Self::ImageBorder {
                variant: BubbleVariant::Sender,
            } => "sender-image-border",
            Self::ImageBorder {
                variant: BubbleVariant::Receiver,
            } => "receiver-image-border",
        }
    }

    /// Clip mask for the content, present only for thumbnail frames.
    pub fn mask_name(&self) -> Option<&'static str> {
        match self {
            Self::TextBackground { .. } => None,
            Self::ImageBorder {
                variant: BubbleVariant::Sender,
            } => Some("sender-image-mask"),
            Self::ImageBorder {
                variant: BubbleVariant::Receiver,
            } => Some("receiver-image-mask"),
        }
    }
}

/// Bubble artwork for `model`, pure so hosts can pick it while pre-rendering.
pub fn bubble_asset_for_model(model: &MessageModel, highlighted: bool) -> BubbleAsset {
    BubbleAsset::select(
        BubbleVariant::for_direction(model.is_from_me()),
        model.kind(),
        highlighted,
    )
}

/// Pending edit-mode transition for the host to animate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditTransition {
    pub animated: bool,
    pub is_editing: bool,
    /// Horizontal shift applied to every frame once the transition settles.
    pub offset: f32,
}

/// Ready notification from the image pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailReady {
    pub message_id: MessageId,
    pub thumbnail: ThumbnailRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualState {
    pub is_selected: bool,
    pub is_editing: bool,
    /// Pressed-bubble artwork while a touch is held on the content.
    pub is_highlighted: bool,
    pub upload: TransferIndicator,
    pub download: TransferIndicator,
    pub variant: BubbleVariant,
    /// Kind of the bound content, which picks text or thumbnail artwork.
    pub content_kind: ContentKind,
    pub thumbnail: Option<ThumbnailRef>,
}

impl Default for VisualState {
    fn default() -> Self {
        Self {
            is_selected: false,
            is_editing: false,
            is_highlighted: false,
            upload: TransferIndicator::Hidden,
            download: TransferIndicator::Hidden,
            variant: BubbleVariant::Receiver,
            content_kind: ContentKind::Text,
            thumbnail: None,
        }
    }
}

impl VisualState {
    /// The single indicator the status slot shows; upload wins over download.
    pub fn status_indicator(&self) -> TransferIndicator {
        match (self.upload, self.download) {
            (TransferIndicator::Hidden, download) => download,
            (upload, _) => upload,
        }
    }

    pub fn bubble_asset(&self) -> BubbleAsset {
        BubbleAsset::select(self.variant, self.content_kind, self.is_highlighted)
    }
}

/// Owns and mutates the per-cell display flags.
#[derive(Debug, Default)]
pub struct VisualStateController {
    state: VisualState,
    pending_transition: Option<EditTransition>,
}

impl VisualStateController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &VisualState {
        &self.state
    }

    /// Resets every flag and picks the bubble variant for the new binding.
    ///
    /// Edit mode is cleared as well; the cell re-reads the transcript-wide value on its
    /// next layout pass.
    pub fn prepare_for_use(&mut self, is_from_me: bool) {
        self.state = VisualState {
            variant: BubbleVariant::for_direction(is_from_me),
            ..VisualState::default()
        };
        self.pending_transition = None;
    }

    /// Returns `false` when the value did not change.
    pub fn set_editing(&mut self, enabled: bool, animated: bool, offset: f32) -> bool {
        if self.state.is_editing == enabled {
            return false;
        }

        self.state.is_editing = enabled;
        self.state.is_highlighted = false;
        if !enabled {
            self.state.is_selected = false;
        }
        self.pending_transition = Some(EditTransition {
            animated,
            is_editing: enabled,
            offset: if enabled { offset } else { 0. },
        });
        tracing::debug!(enabled, animated, "cell edit mode changed");
        true
    }

    pub fn take_transition(&mut self) -> Option<EditTransition> {
        self.pending_transition.take()
    }

    /// Flips selection. Only meaningful in edit mode; returns the new value.
    pub fn toggle_selected(&mut self) -> Option<bool> {
        if !self.state.is_editing {
            return None;
        }
        self.state.is_selected = !self.state.is_selected;
        Some(self.state.is_selected)
    }

    pub fn set_highlighted(&mut self, highlighted: bool) {
        self.state.is_highlighted = highlighted && !self.state.is_editing;
    }

    /// Maps the bound message's delivery status onto the upload indicator.
    pub fn update_upload_status(&mut self, model: &MessageModel) {
        self.state.upload = if model.is_from_me() {
            match model.delivery {
                DeliveryStatus::Pending | DeliveryStatus::Sending => TransferIndicator::Spinner,
                DeliveryStatus::Failed => TransferIndicator::Retry,
                DeliveryStatus::Sent => TransferIndicator::Hidden,
            }
        } else {
            TransferIndicator::Hidden
        };
    }

    /// Maps the bound message's download status onto the download indicator.
    pub fn update_download_status(&mut self, model: &MessageModel) {
        self.state.download = if model.kind().is_media() {
            match model.download {
                DownloadStatus::Downloading => TransferIndicator::Spinner,
                DownloadStatus::Failed => TransferIndicator::Retry,
                DownloadStatus::NotStarted | DownloadStatus::Succeeded => {
                    TransferIndicator::Hidden
                }
            }
        } else {
            TransferIndicator::Hidden
        };
    }

    /// Records which bubble artwork the bound content needs.
    pub fn select_bubble_for(&mut self, model: &MessageModel) {
        self.state.variant = BubbleVariant::for_direction(model.is_from_me());
        self.state.content_kind = model.kind();
    }

    /// Shows whatever thumbnail the snapshot already carries.
    pub fn load_thumbnail_from(&mut self, model: &MessageModel) {
        self.state.thumbnail = model.content.thumbnail().cloned();
    }

    /// Applies a pipeline completion if it still belongs to the bound message.
    pub fn update_thumbnail(
        &mut self,
        bound: Option<&MessageModel>,
        ready: ThumbnailReady,
    ) -> CellResult<()> {
        let bound_id = bound.map(|model| model.id);
        let is_current = bound
            .filter(|model| model.kind().has_thumbnail())
            .is_some_and(|model| model.id == ready.message_id);

        if !is_current {
            return StaleBindingSnafu {
                stage: "update-thumbnail",
                callback: ready.message_id,
                bound: bound_id,
            }
            .fail();
        }

        self.state.thumbnail = Some(ready.thumbnail);
        Ok(())
    }
}
