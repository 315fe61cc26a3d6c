use crate::{BatchStatus, ItemId, LastExport};

/// Side effects requested by [`crate::update`]; executed in order by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ProcessChunk {
        chunk_index: usize,
        item_ids: Vec<ItemId>,
    },
    SwapDirectories,
    PersistBatch,
    ScheduleChunk { chunk_index: usize },
    ClearScheduledChunks,
    CleanupPending,
    RecordLastExport(LastExport),
    SignalFinished(BatchStatus),
    ClearCurrentBatch,
    PruneHistory,
}
