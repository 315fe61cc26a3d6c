use crate::{BatchStatus, ExportBatch};

/// Operator-facing snapshot of a batch, without the chunk id lists.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchStatusView {
    pub export_id: String,
    pub status: BatchStatus,
    pub total_items: usize,
    pub processed: usize,
    pub exported: usize,
    pub failed: usize,
    pub chunk_count: usize,
    pub progress_percentage: f64,
    pub current_operation: String,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub estimated_completion: Option<i64>,
}

impl From<&ExportBatch> for BatchStatusView {
    fn from(batch: &ExportBatch) -> Self {
        Self {
            export_id: batch.export_id.clone(),
            status: batch.status,
            total_items: batch.total_items,
            processed: batch.processed,
            exported: batch.exported,
            failed: batch.failed,
            chunk_count: batch.chunk_count(),
            progress_percentage: batch.progress_percentage,
            current_operation: batch.current_operation.clone(),
            started_at: batch.started_at,
            finished_at: batch.completed_at.or(batch.cancelled_at),
            estimated_completion: batch.estimated_completion,
        }
    }
}

impl ExportBatch {
    pub fn view(&self) -> BatchStatusView {
        BatchStatusView::from(self)
    }
}
