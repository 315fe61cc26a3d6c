use crate::{BatchStatus, Effect, ExportBatch, LastExport, Msg};

/// Pure update function: applies a message to a batch and returns any effects.
///
/// Terminal batches ignore every message, so a late scheduler tick or a chunk
/// that finishes after cancellation cannot change the recorded outcome. A running
/// batch only accepts ticks and results for `next_chunk`, and publishes once every
/// chunk has been recorded.
pub fn update(mut batch: ExportBatch, msg: Msg) -> (ExportBatch, Vec<Effect>) {
    if batch.status.is_terminal() {
        return (batch, Vec::new());
    }

    let effects = match msg {
        Msg::ChunkDue { chunk_index } if chunk_index != batch.next_chunk => Vec::new(),
        Msg::ChunkDue { chunk_index } => match batch.chunks.get(chunk_index) {
            Some(item_ids) => {
                batch.current_operation = format!(
                    "Processing chunk {} of {} ({} items)",
                    chunk_index + 1,
                    batch.chunks.len(),
                    item_ids.len()
                );
                vec![Effect::ProcessChunk {
                    chunk_index,
                    item_ids: item_ids.clone(),
                }]
            }
            None if batch.all_chunks_recorded() => {
                batch.current_operation = "Publishing export".to_string();
                vec![Effect::SwapDirectories]
            }
            None => Vec::new(),
        },
        Msg::ChunkProcessed { chunk_index, .. } if chunk_index != batch.next_chunk => Vec::new(),
        Msg::ChunkProcessed {
            exported,
            failed,
            now,
            ..
        } => {
            batch.record_chunk(exported, failed, now);
            vec![
                Effect::PersistBatch,
                Effect::ScheduleChunk {
                    chunk_index: batch.next_chunk,
                },
            ]
        }
        Msg::SwapFinished { succeeded, now } => {
            batch.completed_at = Some(now);
            batch.estimated_completion = None;
            if succeeded {
                batch.status = BatchStatus::Completed;
                batch.progress_percentage = 100.0;
                batch.current_operation = "Export completed successfully".to_string();
                vec![
                    Effect::PersistBatch,
                    Effect::RecordLastExport(LastExport {
                        timestamp: now,
                        count: batch.exported,
                        item_types: batch.item_types.clone(),
                    }),
                    Effect::CleanupPending,
                    Effect::SignalFinished(BatchStatus::Completed),
                    Effect::ClearCurrentBatch,
                    Effect::PruneHistory,
                ]
            } else {
                batch.status = BatchStatus::Failed;
                batch.current_operation = "Export failed while publishing".to_string();
                vec![
                    Effect::CleanupPending,
                    Effect::PersistBatch,
                    Effect::SignalFinished(BatchStatus::Failed),
                    Effect::ClearCurrentBatch,
                    Effect::PruneHistory,
                ]
            }
        }
        Msg::CancelRequested { now } => {
            batch.status = BatchStatus::Cancelled;
            batch.cancelled_at = Some(now);
            batch.estimated_completion = None;
            batch.current_operation = "Export cancelled by user".to_string();
            vec![
                Effect::PersistBatch,
                Effect::ClearScheduledChunks,
                Effect::CleanupPending,
                Effect::SignalFinished(BatchStatus::Cancelled),
                Effect::ClearCurrentBatch,
                Effect::PruneHistory,
            ]
        }
    };

    (batch, effects)
}
