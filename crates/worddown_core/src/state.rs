use serde::{Deserialize, Serialize};

pub type ItemId = u64;

/// Number of finished batch records kept by default.
pub const DEFAULT_HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    #[default]
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl BatchStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, BatchStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Running => "running",
            BatchStatus::Completed => "completed",
            BatchStatus::Cancelled => "cancelled",
            BatchStatus::Failed => "failed",
        }
    }
}

/// Persisted record of one background export run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBatch {
    pub export_id: String,
    pub status: BatchStatus,
    pub item_types: Vec<String>,
    pub total_items: usize,
    pub processed: usize,
    pub exported: usize,
    pub failed: usize,
    pub chunks: Vec<Vec<ItemId>>,
    /// Index of the only chunk a tick may run next; equal to `chunks.len()` once
    /// every chunk has been recorded.
    #[serde(default)]
    pub next_chunk: usize,
    pub progress_percentage: f64,
    pub current_operation: String,
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub cancelled_at: Option<i64>,
    pub estimated_completion: Option<i64>,
}

impl ExportBatch {
    /// Create a running batch over `item_ids`, partitioned into chunks of `chunk_size`.
    pub fn start(
        export_id: impl Into<String>,
        item_types: Vec<String>,
        item_ids: &[ItemId],
        chunk_size: usize,
        now: i64,
    ) -> Self {
        Self {
            export_id: export_id.into(),
            status: BatchStatus::Running,
            item_types,
            total_items: item_ids.len(),
            processed: 0,
            exported: 0,
            failed: 0,
            chunks: chunk_ids(item_ids, chunk_size),
            next_chunk: 0,
            progress_percentage: 0.0,
            current_operation: "Starting export...".to_string(),
            started_at: now,
            completed_at: None,
            cancelled_at: None,
            estimated_completion: None,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_running(&self) -> bool {
        self.status == BatchStatus::Running
    }

    /// Every chunk has been recorded and every item accounted for.
    pub fn all_chunks_recorded(&self) -> bool {
        self.next_chunk == self.chunks.len() && self.processed == self.total_items
    }

    pub(crate) fn record_chunk(&mut self, exported: usize, failed: usize, now: i64) {
        self.next_chunk += 1;
        self.exported += exported;
        self.failed += failed;
        self.processed += exported + failed;
        self.progress_percentage = progress_percentage(self.processed, self.total_items);
        if let Some(eta) =
            estimate_completion(self.started_at, now, self.processed, self.total_items)
        {
            self.estimated_completion = Some(eta);
        }
    }
}

/// Summary of the last successfully published export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastExport {
    pub timestamp: i64,
    pub count: usize,
    pub item_types: Vec<String>,
}

/// Split ids into consecutive chunks of at most `chunk_size` (minimum 1), keeping order.
pub fn chunk_ids(item_ids: &[ItemId], chunk_size: usize) -> Vec<Vec<ItemId>> {
    item_ids
        .chunks(chunk_size.max(1))
        .map(<[ItemId]>::to_vec)
        .collect()
}

/// `processed / total * 100`, rounded to two decimals. An empty batch counts as done.
pub fn progress_percentage(processed: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let raw = processed as f64 / total as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

/// Project a completion timestamp from the throughput observed so far.
pub fn estimate_completion(started_at: i64, now: i64, processed: usize, total: usize) -> Option<i64> {
    let elapsed = now - started_at;
    if processed == 0 || elapsed <= 0 {
        return None;
    }
    let per_second = processed as f64 / elapsed as f64;
    let remaining = total.saturating_sub(processed) as f64;
    Some(now + (remaining / per_second).round() as i64)
}

/// Ids of batch records to delete so that only the `keep` most recent survive.
/// Recency is `started_at`, ties broken by id, newest first.
pub fn history_to_prune(batches: &[ExportBatch], keep: usize) -> Vec<String> {
    let mut ordered: Vec<&ExportBatch> = batches.iter().collect();
    ordered.sort_by(|a, b| {
        b.started_at
            .cmp(&a.started_at)
            .then_with(|| b.export_id.cmp(&a.export_id))
    });
    ordered
        .into_iter()
        .skip(keep)
        .map(|batch| batch.export_id.clone())
        .collect()
}
