use std::sync::Arc;
use std::thread;

use anyhow::{bail, Context, Result};
use chrono::DateTime;
use engine_logging::{engine_debug, engine_warn};
use worddown_core::{BatchStatusView, LastExport};
use worddown_engine::index::{list_exported, read_exported};
use worddown_engine::page_builder::LayoutSource;
use worddown_engine::{
    load_settings, system_clock, AdapterRegistry, CancelOutcome, ExportContext, ExportDirectory,
    ExportError, Exporter, FileStatusStore, ManifestContentStore, PageBuilderAdapter, RunOutcome,
    Scheduler, StatusReport, TaskQueue,
};

use crate::cli::{Cli, Command};

/// Batch records and the completion flag live here, under the data directory.
const STATE_DIR_NAME: &str = "worddown-state";
const QUEUE_FILE_NAME: &str = "worddown-scheduled.ron";

/// Run the parsed command and return what should be printed.
pub fn execute(cli: &Cli) -> Result<String> {
    let app = App::open(cli)?;
    match &cli.command {
        Command::Export {
            background,
            types,
            limit,
        } => app.export(*background, types, *limit),
        Command::Tick { wait } => app.tick(*wait),
        Command::Status => app.status(),
        Command::Cancel => app.cancel(),
        Command::Files => app.files(),
        Command::Show { id } => app.show(*id),
    }
}

struct App {
    exporter: Exporter,
    queue: Arc<TaskQueue>,
}

impl App {
    fn open(cli: &Cli) -> Result<Self> {
        let settings = load_settings(&cli.config)
            .with_context(|| format!("loading settings from {}", cli.config.display()))?;
        let content = Arc::new(
            ManifestContentStore::from_file(&cli.content)
                .with_context(|| format!("loading content manifest {}", cli.content.display()))?,
        );
        let queue = Arc::new(TaskQueue::persistent(
            cli.data_dir.join(QUEUE_FILE_NAME),
            system_clock(),
        )?);

        let layouts: Arc<dyn LayoutSource> = content.clone();
        let adapters = AdapterRegistry::from_settings(
            &settings,
            vec![Box::new(PageBuilderAdapter::new(
                layouts,
                settings.include_page_builder,
            ))],
        );
        engine_debug!("active adapters: {:?}", adapters.active_names());

        let scheduler: Arc<dyn Scheduler> = queue.clone();
        let ctx = ExportContext::new(
            settings,
            ExportDirectory::new(&cli.data_dir),
            content,
            Arc::new(FileStatusStore::new(cli.data_dir.join(STATE_DIR_NAME))),
            scheduler,
        )
        .with_adapters(adapters);
        Ok(Self {
            exporter: Exporter::new(ctx),
            queue,
        })
    }

    fn export(&self, background: bool, types: &[String], limit: Option<usize>) -> Result<String> {
        let types = (!types.is_empty()).then(|| types.to_vec());
        let outcome = self.exporter.run(types, limit, background)?;
        Ok(match outcome {
            RunOutcome::Immediate { exported } => format!("Exported {exported} items"),
            RunOutcome::Started {
                export_id, message, ..
            } => format!(
                "{message}\nExport id: {export_id}\nRun `worddown tick --wait` to process it"
            ),
        })
    }

    fn tick(&self, wait: bool) -> Result<String> {
        let mut processed = 0;
        loop {
            let now = self.exporter.context().now();
            if let Some(task) = self.queue.take_due(now)? {
                match self.exporter.process_chunk(&task.export_id, task.chunk_index) {
                    Ok(()) => processed += 1,
                    Err(ExportError::UnknownBatch(export_id)) => {
                        engine_warn!("dropping scheduled chunk for unknown export {}", export_id);
                    }
                    Err(err) => {
                        return Err(err).with_context(|| {
                            format!("chunk {} of {}", task.chunk_index, task.export_id)
                        })
                    }
                }
                continue;
            }
            if !wait {
                break;
            }
            let Some(due) = self.queue.next_due()? else {
                break;
            };
            if let Ok(delay) = (due - now).to_std() {
                thread::sleep(delay);
            }
        }
        Ok(format!("Processed {processed} scheduled chunks"))
    }

    fn status(&self) -> Result<String> {
        Ok(match self.exporter.status_report()? {
            StatusReport::Running(batch) => describe_batch(&batch.view()),
            StatusReport::Finished {
                status,
                last_export,
            } => format!(
                "Export {}\n{}",
                status.as_str(),
                describe_last_export(last_export.as_ref())
            ),
            StatusReport::Idle { last_export } => describe_last_export(last_export.as_ref()),
        })
    }

    fn cancel(&self) -> Result<String> {
        Ok(match self.exporter.cancel()? {
            CancelOutcome::Cancelled { export_id } => format!("Cancelled export {export_id}"),
            CancelOutcome::NotRunning => "No export is running".to_string(),
        })
    }

    fn files(&self) -> Result<String> {
        let ctx = self.exporter.context();
        let files = list_exported(&ctx.directories, &ctx.settings.export_post_types)?;
        if files.is_empty() {
            return Ok("No exported files".to_string());
        }
        let lines: Vec<String> = files
            .iter()
            .map(|file| {
                format!(
                    "{:>6}  {:<8} {:>8}  {}  {}",
                    file.id, file.item_type, file.file_size, file.filename, file.title
                )
            })
            .collect();
        Ok(lines.join("\n"))
    }

    fn show(&self, id: u64) -> Result<String> {
        let ctx = self.exporter.context();
        match read_exported(&ctx.directories, &ctx.settings.export_post_types, id)? {
            Some((_, content)) => Ok(content.trim_end().to_string()),
            None => bail!("no exported file for item {id}"),
        }
    }
}

fn describe_batch(view: &BatchStatusView) -> String {
    let mut lines = vec![
        format!(
            "Export {}: {} {:.2}%",
            view.export_id,
            view.status.as_str(),
            view.progress_percentage
        ),
        format!(
            "{}/{} items processed ({} exported, {} failed) in {} chunks",
            view.processed, view.total_items, view.exported, view.failed, view.chunk_count
        ),
        view.current_operation.clone(),
        format!("Started: {}", format_timestamp(view.started_at)),
    ];
    if let Some(eta) = view.estimated_completion {
        lines.push(format!("Estimated completion: {}", format_timestamp(eta)));
    }
    lines.join("\n")
}

fn describe_last_export(last: Option<&LastExport>) -> String {
    match last {
        Some(last) => format!(
            "Last export: {} items ({}) at {}",
            last.count,
            last.item_types.join(", "),
            format_timestamp(last.timestamp)
        ),
        None => "No export has been published yet".to_string(),
    }
}

fn format_timestamp(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
