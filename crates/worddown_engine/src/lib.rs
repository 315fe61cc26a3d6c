//! Worddown engine: HTML cleaning, Markdown conversion and the export pipeline.
mod adapter;
mod context;
mod convert;
mod decode;
mod directory;
mod error;
mod filename;
mod frontmatter;
mod hooks;
pub mod index;
mod orchestrator;
pub mod page_builder;
mod persist;
pub mod sanitize;
mod scheduler;
mod settings;
mod store;
mod types;

pub use adapter::{Adapter, AdapterRegistry};
pub use context::{system_clock, Clock, ExportContext};
pub use convert::{clean_markdown, setext_to_atx, Converter, Html2MdConverter, MarkdownConverter};
pub use decode::{decode_html, DecodeError, DecodedHtml};
pub use directory::{DirectoryRole, ExportDirectory, LIVE_DIR_NAME, PENDING_DIR_NAME};
pub use error::{AdapterError, ExportError, PersistError, SettingsError, StoreError, SwapError};
pub use filename::{artifact_filename, effective_slug, parse_item_id, slugify};
pub use frontmatter::{build_markdown_document, item_front_matter, FrontMatter, FrontMatterValue};
pub use hooks::{ExportHooks, NoopHooks};
pub use orchestrator::{
    status_key, CancelOutcome, Exporter, StatusReport, COMPLETED_FLAG_KEY, CURRENT_EXPORT_KEY,
    EXPORT_STATUS_PREFIX, LAST_EXPORT_KEY,
};
pub use page_builder::PageBuilderAdapter;
pub use persist::{ensure_output_dir, remove_dir_if_exists, AtomicFileWriter};
pub use sanitize::ContentSanitizer;
pub use scheduler::{ScheduledChunk, Scheduler, TaskQueue};
pub use settings::{load_settings, ExportSettings, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
pub use store::{
    read_record, write_record, ContentStore, FileStatusStore, ManifestContentStore,
    MemoryStatusStore, StatusStore,
};
pub use types::{ContentItem, ExportArtifact, FailureKind, ItemId, ItemStatus, RunOutcome, Stage};
