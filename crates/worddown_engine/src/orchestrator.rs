//! Export orchestration.
//!
//! Background batches are persisted [`ExportBatch`] records driven by the pure
//! [`worddown_core::update`] function: every scheduler tick becomes a [`Msg`], and
//! the returned [`Effect`]s are executed here in order. Immediate runs share the
//! per-item pipeline and the publish step but keep no batch record.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use engine_logging::{
    clear_export_context, engine_debug, engine_error, engine_info, engine_warn, export_context,
    set_export_context,
};
use sha2::{Digest, Sha256};
use worddown_core::{
    history_to_prune, update, BatchStatus, Effect, ExportBatch, ItemId, LastExport, Msg,
};

use crate::context::ExportContext;
use crate::convert::MarkdownConverter;
use crate::directory::DirectoryRole;
use crate::error::ExportError;
use crate::filename::{artifact_filename, effective_slug};
use crate::frontmatter::{build_markdown_document, item_front_matter};
use crate::persist::AtomicFileWriter;
use crate::sanitize::ContentSanitizer;
use crate::store::{read_record, write_record};
use crate::{ContentItem, ExportArtifact, FailureKind, RunOutcome, Stage};

pub const CURRENT_EXPORT_KEY: &str = "worddown_current_export";
pub const EXPORT_STATUS_PREFIX: &str = "worddown_export_status_";
pub const LAST_EXPORT_KEY: &str = "worddown_last_export";
pub const COMPLETED_FLAG_KEY: &str = "worddown_export_completed";

static EXPORT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

const STAGE_SANITIZING: u8 = 0;
const STAGE_CONVERTING: u8 = 1;

pub fn status_key(export_id: &str) -> String {
    format!("{EXPORT_STATUS_PREFIX}{export_id}")
}

/// What an operator sees when polling.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusReport {
    Running(ExportBatch),
    /// A batch reached a terminal state since the last poll. Reported once.
    Finished {
        status: BatchStatus,
        last_export: Option<LastExport>,
    },
    Idle {
        last_export: Option<LastExport>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled { export_id: String },
    NotRunning,
}

enum Flow {
    Continue,
    Then(Msg),
    Stop,
}

pub struct Exporter {
    ctx: ExportContext,
}

impl Exporter {
    pub fn new(ctx: ExportContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &ExportContext {
        &self.ctx
    }

    /// Start an export of `item_types` (settings types when `None`).
    ///
    /// Immediate runs process everything now and publish; background runs persist a
    /// batch and schedule its first chunk.
    pub fn run(
        &self,
        item_types: Option<Vec<String>>,
        limit: Option<usize>,
        background: bool,
    ) -> Result<RunOutcome, ExportError> {
        if let Some(batch) = self.status()? {
            if batch.is_running() {
                return Err(ExportError::BatchRunning(batch.export_id));
            }
        }

        let settings = &self.ctx.settings;
        let item_types = item_types.unwrap_or_else(|| settings.export_post_types.clone());
        let ids = self
            .ctx
            .content
            .query_item_ids(&item_types, &settings.statuses(), limit)?;

        self.ctx.directories.cleanup_pending()?;
        self.ctx.directories.setup_pending(&item_types)?;

        if background {
            self.start_background(item_types, &ids)
        } else {
            Ok(self.run_immediate(item_types, &ids))
        }
    }

    fn run_immediate(&self, item_types: Vec<String>, ids: &[ItemId]) -> RunOutcome {
        engine_info!("immediate export of {} items", ids.len());
        self.ctx.hooks.before_export();
        let exported = ids.iter().filter(|id| self.export_item(**id)).count();
        self.ctx.hooks.after_export();

        let directories = &self.ctx.directories;
        let exported = match directories.swap() {
            Ok(()) => {
                let summary = LastExport {
                    timestamp: self.ctx.now().timestamp(),
                    count: exported,
                    item_types,
                };
                if let Err(err) = write_record(self.ctx.status.as_ref(), LAST_EXPORT_KEY, &summary) {
                    engine_error!("failed to record last export: {}", err);
                }
                exported
            }
            Err(err) => {
                engine_error!("immediate export not published: {}", err);
                0
            }
        };
        if let Err(err) = directories.cleanup_pending() {
            engine_warn!("failed to remove pending export: {}", err);
        }
        engine_info!("immediate export finished: {} published", exported);
        RunOutcome::Immediate { exported }
    }

    fn start_background(
        &self,
        item_types: Vec<String>,
        ids: &[ItemId],
    ) -> Result<RunOutcome, ExportError> {
        let now = self.ctx.now();
        let export_id = new_export_id(now, ids);
        let batch = ExportBatch::start(
            export_id.clone(),
            item_types,
            ids,
            self.ctx.settings.effective_chunk_size(),
            now.timestamp(),
        );
        let status = self.ctx.status.as_ref();
        write_record(status, &status_key(&export_id), &batch)?;
        write_record(status, CURRENT_EXPORT_KEY, &export_id)?;
        self.ctx.scheduler.schedule_once(0, &export_id, 0)?;

        set_export_context(Some(&export_id));
        engine_info!(
            "background export started: {} items in {} chunks",
            batch.total_items,
            batch.chunk_count()
        );
        clear_export_context();

        Ok(RunOutcome::Started {
            export_id,
            total_items: batch.total_items,
            message: format!("Background export started for {} items", batch.total_items),
        })
    }

    /// Handle one scheduler tick for `export_id`. Ticks for finished batches and ticks
    /// for any chunk other than the batch's next one are ignored.
    pub fn process_chunk(&self, export_id: &str, chunk_index: usize) -> Result<(), ExportError> {
        let batch: ExportBatch = read_record(self.ctx.status.as_ref(), &status_key(export_id))?
            .ok_or_else(|| ExportError::UnknownBatch(export_id.to_string()))?;
        set_export_context(Some(export_id));
        if batch.is_running() && chunk_index != batch.next_chunk {
            engine_warn!(
                "ignoring tick for chunk {}; next chunk is {}",
                chunk_index,
                batch.next_chunk
            );
        }
        let result = self.drive(batch, Msg::ChunkDue { chunk_index });
        clear_export_context();
        result
    }

    /// Cancel the running background batch, discarding its pending output.
    pub fn cancel(&self) -> Result<CancelOutcome, ExportError> {
        let Some(batch) = self.status()? else {
            return Ok(CancelOutcome::NotRunning);
        };
        if !batch.is_running() {
            self.ctx.status.delete(CURRENT_EXPORT_KEY)?;
            return Ok(CancelOutcome::NotRunning);
        }

        let export_id = batch.export_id.clone();
        set_export_context(Some(&export_id));
        engine_info!("cancelling export after {} of {} items", batch.processed, batch.total_items);
        let now = self.ctx.now().timestamp();
        let result = self.drive(batch, Msg::CancelRequested { now });
        clear_export_context();
        result?;
        Ok(CancelOutcome::Cancelled { export_id })
    }

    /// The batch currently tracked as in flight, if any.
    pub fn status(&self) -> Result<Option<ExportBatch>, ExportError> {
        let status = self.ctx.status.as_ref();
        let Some(export_id) = read_record::<String>(status, CURRENT_EXPORT_KEY)? else {
            return Ok(None);
        };
        Ok(read_record(status, &status_key(&export_id))?)
    }

    pub fn batch(&self, export_id: &str) -> Result<Option<ExportBatch>, ExportError> {
        Ok(read_record(self.ctx.status.as_ref(), &status_key(export_id))?)
    }

    pub fn last_export(&self) -> Result<Option<LastExport>, ExportError> {
        Ok(read_record(self.ctx.status.as_ref(), LAST_EXPORT_KEY)?)
    }

    /// Current batch, else a one-shot completion notice, else the idle summary.
    pub fn status_report(&self) -> Result<StatusReport, ExportError> {
        if let Some(batch) = self.status()? {
            if batch.is_running() {
                return Ok(StatusReport::Running(batch));
            }
        }
        let last_export = self.last_export()?;
        let status = self.ctx.status.as_ref();
        match read_record::<BatchStatus>(status, COMPLETED_FLAG_KEY)? {
            Some(finished) => {
                status.delete(COMPLETED_FLAG_KEY)?;
                Ok(StatusReport::Finished {
                    status: finished,
                    last_export,
                })
            }
            None => Ok(StatusReport::Idle { last_export }),
        }
    }

    /// Export one item into the pending tree. Failures are logged and reported as `false`.
    pub fn export_item(&self, id: ItemId) -> bool {
        match self.try_export_item(id) {
            Ok(path) => {
                engine_debug!("exported item {} to {}", id, path.display());
                true
            }
            Err(kind) => {
                engine_warn!("item {} failed: {}", id, kind);
                false
            }
        }
    }

    pub fn try_export_item(&self, id: ItemId) -> Result<PathBuf, FailureKind> {
        let item = self
            .ctx
            .content
            .get_item(id)
            .map_err(|e| FailureKind::Store(e.to_string()))?
            .ok_or(FailureKind::MissingItem)?;
        let artifact = self.render_item(&item)?;

        let dir = self
            .ctx
            .directories
            .type_dir(DirectoryRole::Pending, &artifact.item_type);
        AtomicFileWriter::existing_dir(dir.clone())
            .write(&artifact.filename, &artifact.document)
            .map_err(|e| FailureKind::Write {
                path: dir.join(&artifact.filename),
                message: e.to_string(),
            })
    }

    /// Adapters, sanitizer and converter applied to one item; nothing is written.
    pub fn render_item(&self, item: &ContentItem) -> Result<ExportArtifact, FailureKind> {
        let injected = self.ctx.adapters.inject_all(&item.raw_content_html, item);
        let body_markdown = self.convert_bounded(injected)?;

        let slug = effective_slug(&item.slug, &item.title);
        let front_matter = item_front_matter(item, &slug);
        let document = build_markdown_document(&item.title, &front_matter, &body_markdown);
        Ok(ExportArtifact {
            item_type: item.item_type.clone(),
            filename: artifact_filename(&item.item_type, &slug, item.id),
            front_matter,
            body_markdown,
            document,
        })
    }

    /// Sanitize and convert on a worker thread, giving up after the configured timeout.
    /// A timed-out worker is abandoned; its result is discarded.
    fn convert_bounded(&self, html: String) -> Result<String, FailureKind> {
        let stage = Arc::new(AtomicU8::new(STAGE_SANITIZING));
        let timeout = self.ctx.settings.conversion_timeout_secs;
        if timeout == 0 {
            return Ok(sanitize_and_convert(
                &self.ctx.sanitizer,
                &self.ctx.converter,
                &html,
                &stage,
            ));
        }

        let sanitizer = Arc::clone(&self.ctx.sanitizer);
        let converter = Arc::clone(&self.ctx.converter);
        let worker_stage = Arc::clone(&stage);
        let log_context = export_context();
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("worddown-convert".to_string())
            .spawn(move || {
                set_export_context(log_context.as_deref());
                let markdown = sanitize_and_convert(&sanitizer, &converter, &html, &worker_stage);
                let _ = tx.send(markdown);
            })
            .map_err(|_| FailureKind::ProcessingError {
                stage: Stage::Sanitizing,
            })?;

        match rx.recv_timeout(Duration::from_secs(timeout)) {
            Ok(markdown) => Ok(markdown),
            Err(RecvTimeoutError::Timeout) => Err(FailureKind::ProcessingTimeout {
                stage: load_stage(&stage),
            }),
            Err(RecvTimeoutError::Disconnected) => Err(FailureKind::ProcessingError {
                stage: load_stage(&stage),
            }),
        }
    }

    fn drive(&self, batch: ExportBatch, msg: Msg) -> Result<(), ExportError> {
        let mut batch = batch;
        let mut inbox = VecDeque::from([msg]);
        while let Some(msg) = inbox.pop_front() {
            let (next, effects) = update(batch, msg);
            batch = next;
            for effect in effects {
                match self.execute(&batch, effect)? {
                    Flow::Continue => {}
                    Flow::Then(msg) => inbox.push_back(msg),
                    Flow::Stop => return Ok(()),
                }
            }
        }
        Ok(())
    }

    fn execute(&self, batch: &ExportBatch, effect: Effect) -> Result<Flow, ExportError> {
        let status = self.ctx.status.as_ref();
        match effect {
            Effect::ProcessChunk {
                chunk_index,
                item_ids,
            } => {
                engine_info!("{}", batch.current_operation);
                self.ctx.hooks.before_export();
                let exported = item_ids.iter().filter(|id| self.export_item(**id)).count();
                self.ctx.hooks.after_export();
                let failed = item_ids.len() - exported;
                engine_info!(
                    "chunk {} done: {} exported, {} failed",
                    chunk_index + 1,
                    exported,
                    failed
                );
                Ok(Flow::Then(Msg::ChunkProcessed {
                    chunk_index,
                    exported,
                    failed,
                    now: self.ctx.now().timestamp(),
                }))
            }
            Effect::SwapDirectories => {
                let succeeded = self.ctx.directories.swap().is_ok();
                Ok(Flow::Then(Msg::SwapFinished {
                    succeeded,
                    now: self.ctx.now().timestamp(),
                }))
            }
            Effect::PersistBatch => {
                if batch.is_running() && self.superseded(batch)? {
                    engine_info!("batch moved on while chunk was running; dropping its result");
                    return Ok(Flow::Stop);
                }
                write_record(status, &status_key(&batch.export_id), batch)?;
                Ok(Flow::Continue)
            }
            Effect::ScheduleChunk { chunk_index } => {
                self.ctx.scheduler.schedule_once(
                    self.ctx.settings.chunk_delay_secs,
                    &batch.export_id,
                    chunk_index,
                )?;
                Ok(Flow::Continue)
            }
            Effect::ClearScheduledChunks => {
                let removed = self.ctx.scheduler.clear()?;
                engine_debug!("cleared {} scheduled chunks", removed);
                Ok(Flow::Continue)
            }
            Effect::CleanupPending => {
                if let Err(err) = self.ctx.directories.cleanup_pending() {
                    engine_error!("failed to remove pending export: {}", err);
                }
                Ok(Flow::Continue)
            }
            Effect::RecordLastExport(summary) => {
                write_record(status, LAST_EXPORT_KEY, &summary)?;
                Ok(Flow::Continue)
            }
            Effect::SignalFinished(finished) => {
                engine_info!(
                    "export {}: {} exported, {} failed",
                    finished.as_str(),
                    batch.exported,
                    batch.failed
                );
                write_record(status, COMPLETED_FLAG_KEY, &finished)?;
                Ok(Flow::Continue)
            }
            Effect::ClearCurrentBatch => {
                let current: Option<String> = read_record(status, CURRENT_EXPORT_KEY)?;
                if current.as_deref() == Some(batch.export_id.as_str()) {
                    status.delete(CURRENT_EXPORT_KEY)?;
                }
                Ok(Flow::Continue)
            }
            Effect::PruneHistory => {
                self.prune_history()?;
                Ok(Flow::Continue)
            }
        }
    }

    /// The stored record already finished, or already holds this chunk's result
    /// from an overlapping tick.
    fn superseded(&self, batch: &ExportBatch) -> Result<bool, ExportError> {
        let stored: Option<ExportBatch> =
            read_record(self.ctx.status.as_ref(), &status_key(&batch.export_id))?;
        Ok(stored.is_some_and(|b| b.status.is_terminal() || b.next_chunk >= batch.next_chunk))
    }

    /// Delete finished batch records beyond the configured history limit.
    pub fn prune_history(&self) -> Result<Vec<String>, ExportError> {
        let status = self.ctx.status.as_ref();
        let mut finished = Vec::new();
        for key in status.keys_with_prefix(EXPORT_STATUS_PREFIX)? {
            match read_record::<ExportBatch>(status, &key) {
                Ok(Some(batch)) if !batch.is_running() => finished.push(batch),
                Ok(_) => {}
                Err(err) => engine_warn!("skipping unreadable batch record {}: {}", key, err),
            }
        }
        let doomed = history_to_prune(&finished, self.ctx.settings.history_limit);
        for export_id in &doomed {
            status.delete(&status_key(export_id))?;
            engine_debug!("pruned batch record {}", export_id);
        }
        Ok(doomed)
    }
}

fn sanitize_and_convert(
    sanitizer: &ContentSanitizer,
    converter: &MarkdownConverter,
    html: &str,
    stage: &AtomicU8,
) -> String {
    stage.store(STAGE_SANITIZING, Ordering::SeqCst);
    let clean = sanitizer.clean(html);
    stage.store(STAGE_CONVERTING, Ordering::SeqCst);
    converter.to_markdown(&clean)
}

fn load_stage(stage: &AtomicU8) -> Stage {
    match stage.load(Ordering::SeqCst) {
        STAGE_SANITIZING => Stage::Sanitizing,
        _ => Stage::Converting,
    }
}

/// `export_{utc timestamp}_{8 hex chars}`, unique per run.
fn new_export_id(now: DateTime<Utc>, ids: &[ItemId]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(now.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    hasher.update(EXPORT_SEQUENCE.fetch_add(1, Ordering::Relaxed).to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    for id in ids {
        hasher.update(id.to_le_bytes());
    }
    let digest = hasher.finalize();
    let short: String = digest.iter().take(4).map(|b| format!("{b:02x}")).collect();
    format!("export_{}_{}", now.format("%Y%m%d%H%M%S"), short)
}
