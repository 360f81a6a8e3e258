#![deny(unsafe_code)]

pub mod cell;
pub mod config;
pub mod delegate;
pub mod edit_mode;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod layout;
pub mod measure;
pub mod menu;
pub mod model;
pub mod state;

pub use cell::MessageCell;
pub use config::{CellConfig, CellMetrics};
pub use delegate::{CellDelegate, CellEvent, ChannelDelegate, DelegateMessage};
pub use edit_mode::{EditMode, EditModeBroadcast};
pub use error::{CellError, CellResult, ConfigError, ConfigResult};
pub use geometry::{Point, Rect, Size};
pub use gesture::{ContentView, GestureEvent, GesturePhase, GestureRouter};
pub use layout::{CellGeometry, LayoutEngine, LayoutInput};
pub use measure::HeightCache;
pub use menu::{ActionMenuController, MenuAction, MenuItem, MenuSpec, PresentedMenu, build_menu};
pub use model::{
    ContentKind, DeliveryStatus, Direction, DownloadStatus, MessageContent, MessageId,
    MessageModel, PixelSize, ThumbnailRef,
};
pub use state::{
    BubbleAsset, BubbleVariant, EditTransition, ThumbnailReady, TransferIndicator, VisualState,
    VisualStateController, bubble_asset_for_model,
};
