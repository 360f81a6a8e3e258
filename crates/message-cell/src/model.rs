use std::hash::{DefaultHasher, Hasher};

use serde::{Deserialize, Serialize};

/// Stable identifier for one message, used for staleness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl MessageId {
    /// Creates a typed message identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Message direction relative to the viewing user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    FromMe,
    ToMe,
}

impl Direction {
    pub fn is_from_me(self) -> bool {
        matches!(self, Self::FromMe)
    }

    pub fn from_flag(is_from_me: bool) -> Self {
        if is_from_me { Self::FromMe } else { Self::ToMe }
    }
}

/// Outgoing delivery lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Sending,
    #[default]
    Sent,
    Failed,
}

/// Media attachment download lifecycle. Meaningless for text messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    #[default]
    NotStarted,
    Downloading,
    Succeeded,
    Failed,
}

/// Opaque handle into the external image pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThumbnailRef(pub String);

impl ThumbnailRef {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Payload-specific fields of a message snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        text: String,
    },
    Image {
        #[serde(default)]
        thumbnail: Option<ThumbnailRef>,
        #[serde(default)]
        pixel_size: Option<PixelSize>,
    },
    Audio {
        duration_secs: f32,
    },
    Video {
        #[serde(default)]
        thumbnail: Option<ThumbnailRef>,
        #[serde(default)]
        pixel_size: Option<PixelSize>,
        duration_secs: f32,
    },
    File {
        name: String,
        size_bytes: u64,
    },
    Unsupported,
}

/// Variant tag that selects the per-content measuring, hit-testing and menu strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Text,
    Image,
    Audio,
    Video,
    File,
    Unsupported,
}

impl ContentKind {
    /// Media content is hit-tested as a thumbnail and has a download lifecycle.
    pub fn is_media(self) -> bool {
        matches!(self, Self::Image | Self::Video | Self::Audio | Self::File)
    }

    pub fn has_thumbnail(self) -> bool {
        matches!(self, Self::Image | Self::Video)
    }
}

impl MessageContent {
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Text { .. } => ContentKind::Text,
            Self::Image { .. } => ContentKind::Image,
            Self::Audio { .. } => ContentKind::Audio,
            Self::Video { .. } => ContentKind::Video,
            Self::File { .. } => ContentKind::File,
            Self::Unsupported => ContentKind::Unsupported,
        }
    }

    pub fn thumbnail(&self) -> Option<&ThumbnailRef> {
        match self {
            Self::Image { thumbnail, .. } | Self::Video { thumbnail, .. } => thumbnail.as_ref(),
            Self::Text { .. } | Self::Audio { .. } | Self::File { .. } | Self::Unsupported => None,
        }
    }
}

/// Read-only snapshot of one message as supplied by the chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageModel {
    pub id: MessageId,
    pub direction: Direction,
    pub content: MessageContent,
    #[serde(default)]
    pub delivery: DeliveryStatus,
    #[serde(default)]
    pub download: DownloadStatus,
    #[serde(default)]
    pub is_read: bool,
}

impl MessageModel {
    /// Creates a message snapshot with explicit direction and content.
    pub fn new(id: MessageId, direction: Direction, content: MessageContent) -> Self {
        Self {
            id,
            direction,
            content,
            delivery: DeliveryStatus::default(),
            download: DownloadStatus::default(),
            is_read: false,
        }
    }

    pub fn text(id: MessageId, direction: Direction, text: impl Into<String>) -> Self {
        Self::new(id, direction, MessageContent::Text { text: text.into() })
    }

    pub fn image(id: MessageId, direction: Direction, pixel_size: PixelSize) -> Self {
        Self::new(
            id,
            direction,
            MessageContent::Image {
                thumbnail: None,
                pixel_size: Some(pixel_size),
            },
        )
    }

    pub fn with_delivery(mut self, delivery: DeliveryStatus) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn with_download(mut self, download: DownloadStatus) -> Self {
        self.download = download;
        self
    }

    pub fn with_read(mut self, is_read: bool) -> Self {
        self.is_read = is_read;
        self
    }

    pub fn kind(&self) -> ContentKind {
        self.content.kind()
    }

    pub fn is_from_me(&self) -> bool {
        self.direction.is_from_me()
    }
}

/// Hash of everything that affects the measured height of a message.
///
/// Status fields are excluded: the status indicator sits beside the bubble and never
/// changes the row height.
pub fn layout_hash(model: &MessageModel) -> u64 {
    let mut hasher = DefaultHasher::new();
    hasher.write_u64(model.id.0);
    hasher.write_u8(match model.direction {
        Direction::FromMe => 0,
        Direction::ToMe => 1,
    });

    match &model.content {
        MessageContent::Text { text } => {
            hasher.write_u8(0);
            hasher.write(text.as_bytes());
        }
        MessageContent::Image { pixel_size, .. } => {
            hasher.write_u8(1);
            write_pixel_size(&mut hasher, *pixel_size);
        }
        MessageContent::Audio { duration_secs } => {
            hasher.write_u8(2);
            hasher.write_u32(duration_secs.to_bits());
        }
        MessageContent::Video {
            pixel_size,
            duration_secs,
            ..
        } => {
            hasher.write_u8(3);
            write_pixel_size(&mut hasher, *pixel_size);
            hasher.write_u32(duration_secs.to_bits());
        }
        MessageContent::File { name, size_bytes } => {
            hasher.write_u8(4);
            hasher.write(name.as_bytes());
            hasher.write_u64(*size_bytes);
        }
        MessageContent::Unsupported => hasher.write_u8(5),
    }

    hasher.finish()
}

fn write_pixel_size(hasher: &mut DefaultHasher, pixel_size: Option<PixelSize>) {
    match pixel_size {
        Some(size) => {
            hasher.write_u8(1);
            hasher.write_u32(size.width);
            hasher.write_u32(size.height);
        }
        None => hasher.write_u8(0),
    }
}
