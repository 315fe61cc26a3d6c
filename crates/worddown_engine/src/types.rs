use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub use worddown_core::ItemId;

/// Publication status of a content item in the source store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Publish,
    Draft,
    Pending,
    Private,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Publish => "publish",
            ItemStatus::Draft => "draft",
            ItemStatus::Pending => "pending",
            ItemStatus::Private => "private",
        }
    }
}

/// Snapshot of one exportable page/post taken at export time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub id: ItemId,
    pub item_type: String,
    pub title: String,
    pub raw_content_html: String,
    pub slug: String,
    pub status: ItemStatus,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
    pub excerpt: String,
    pub categories: Vec<String>,
    pub permalink: String,
}

/// Markdown file produced for one [`ContentItem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub item_type: String,
    pub filename: String,
    pub front_matter: crate::FrontMatter,
    pub body_markdown: String,
    pub document: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Sanitizing,
    Converting,
}

/// Why a single item failed to export. Never fatal to the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    MissingItem,
    Store(String),
    Write { path: PathBuf, message: String },
    ProcessingTimeout { stage: Stage },
    ProcessingError { stage: Stage },
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::MissingItem => write!(f, "item not found"),
            FailureKind::Store(message) => write!(f, "content store error: {message}"),
            FailureKind::Write { path, message } => {
                write!(f, "failed to write {}: {message}", path.display())
            }
            FailureKind::ProcessingTimeout { stage } => {
                write!(f, "processing timeout at stage {stage:?}")
            }
            FailureKind::ProcessingError { stage } => {
                write!(f, "processing error at stage {stage:?}")
            }
        }
    }
}

/// Result of [`crate::Exporter::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Immediate pass finished; number of items published (0 if the swap failed).
    Immediate { exported: usize },
    /// Background batch persisted and its first chunk scheduled.
    Started {
        export_id: String,
        total_items: usize,
        message: String,
    },
}
