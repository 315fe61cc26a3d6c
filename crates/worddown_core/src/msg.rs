#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// The scheduler fired for `chunk_index`.
    ChunkDue { chunk_index: usize },
    /// Every item of a chunk was attempted.
    ChunkProcessed {
        chunk_index: usize,
        exported: usize,
        failed: usize,
        now: i64,
    },
    /// The pending tree was (or failed to be) promoted to live.
    SwapFinished { succeeded: bool, now: i64 },
    /// Operator asked to stop the batch.
    CancelRequested { now: i64 },
}
