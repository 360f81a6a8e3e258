use std::path::PathBuf;

use snafu::Snafu;

use crate::model::MessageId;

/// Internal failures of a cell operation.
///
/// None of these escape the public cell API: callers log and drop them so the cell
/// degrades to a visible-but-inert state.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CellError {
    #[snafu(display("callback for message {callback:?} arrived while {bound:?} is bound"))]
    StaleBinding {
        stage: &'static str,
        callback: MessageId,
        bound: Option<MessageId>,
    },
    #[snafu(display("cell delegate is gone, dropping {event}"))]
    DelegateGone {
        stage: &'static str,
        event: &'static str,
    },
    #[snafu(display("no message is bound to this cell"))]
    Unbound { stage: &'static str },
    #[snafu(display("menu cannot be shown: {details}"))]
    MenuUnavailable {
        stage: &'static str,
        details: &'static str,
    },
}

pub type CellResult<T> = Result<T, CellError>;

/// Errors that can occur while loading cell configuration.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("failed to extract cell config from {}", path.display()))]
    Extract {
        stage: &'static str,
        path: PathBuf,
        #[snafu(source(from(figment::Error, Box::new)))]
        source: Box<figment::Error>,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
