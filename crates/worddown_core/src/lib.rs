//! Worddown core: pure export-batch state machine and view-model helpers.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use state::{
    chunk_ids, estimate_completion, history_to_prune, progress_percentage, BatchStatus,
    ExportBatch, ItemId, LastExport, DEFAULT_HISTORY_LIMIT,
};
pub use update::update;
pub use view_model::BatchStatusView;
