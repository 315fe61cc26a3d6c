use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::ItemId;

pub use crate::persist::PersistError;

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("pending directory {0} does not exist")]
    PendingMissing(PathBuf),
    #[error("failed to remove live directory: {0}")]
    RemoveLive(#[source] io::Error),
    #[error("failed to move pending directory into place: {0}")]
    Rename(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("serialize error: {0}")]
    Serialize(String),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("no layout available for item {0}")]
    MissingLayout(ItemId),
    #[error("failed to render module {module}: {message}")]
    Render { module: String, message: String },
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("swap error: {0}")]
    Swap(#[from] SwapError),
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
    #[error("unknown export batch {0}")]
    UnknownBatch(String),
    #[error("export {0} is still running")]
    BatchRunning(String),
}
