use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::context::Clock;
use crate::error::StoreError;
use crate::persist::AtomicFileWriter;

const MAX_DELAY_SECS: u64 = 366 * 24 * 60 * 60;

/// A deferred "process chunk `chunk_index` of `export_id`" invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledChunk {
    pub export_id: String,
    pub chunk_index: usize,
    pub due_at: DateTime<Utc>,
}

pub trait Scheduler: Send + Sync {
    /// Run chunk `chunk_index` of `export_id` once, `delay_secs` from now.
    fn schedule_once(
        &self,
        delay_secs: u64,
        export_id: &str,
        chunk_index: usize,
    ) -> Result<(), StoreError>;

    /// Drop every scheduled chunk. Returns how many were removed.
    fn clear(&self) -> Result<usize, StoreError>;
}

/// Scheduler backed by a queue, optionally mirrored to a RON file so scheduled
/// chunks survive a restart. Callers drain it with [`TaskQueue::take_due`].
pub struct TaskQueue {
    clock: Clock,
    path: Option<PathBuf>,
    tasks: Mutex<Vec<ScheduledChunk>>,
}

impl TaskQueue {
    pub fn in_memory(clock: Clock) -> Self {
        Self {
            clock,
            path: None,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Queue persisted at `path`, loading tasks already stored there.
    pub fn persistent(path: PathBuf, clock: Clock) -> Result<Self, StoreError> {
        let tasks = match fs::read_to_string(&path) {
            Ok(text) => ron::from_str(&text).map_err(|e| StoreError::Parse(e.to_string()))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(StoreError::Io(err)),
        };
        Ok(Self {
            clock,
            path: Some(path),
            tasks: Mutex::new(tasks),
        })
    }

    /// Remove and return the earliest task due at or before `now`.
    pub fn take_due(&self, now: DateTime<Utc>) -> Result<Option<ScheduledChunk>, StoreError> {
        let mut tasks = self.lock()?;
        let next = tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.due_at <= now)
            .min_by_key(|(_, task)| task.due_at)
            .map(|(index, _)| index);
        let Some(index) = next else {
            return Ok(None);
        };
        let task = tasks.remove(index);
        self.save(&tasks)?;
        Ok(Some(task))
    }

    /// Earliest due time of any queued task.
    pub fn next_due(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.lock()?.iter().map(|task| task.due_at).min())
    }

    pub fn pending(&self) -> Result<Vec<ScheduledChunk>, StoreError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<ScheduledChunk>>, StoreError> {
        self.tasks
            .lock()
            .map_err(|_| StoreError::Io(io::Error::other("task queue lock poisoned")))
    }

    fn save(&self, tasks: &[ScheduledChunk]) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let text = ron::ser::to_string_pretty(tasks, ron::ser::PrettyConfig::default())
            .map_err(|e| StoreError::Serialize(e.to_string()))?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tasks.ron".to_string());
        AtomicFileWriter::new(dir).write(&filename, &text)?;
        Ok(())
    }
}

impl Scheduler for TaskQueue {
    fn schedule_once(
        &self,
        delay_secs: u64,
        export_id: &str,
        chunk_index: usize,
    ) -> Result<(), StoreError> {
        let delay = Duration::seconds(delay_secs.min(MAX_DELAY_SECS) as i64);
        let due_at = (self.clock)() + delay;
        let mut tasks = self.lock()?;
        tasks.push(ScheduledChunk {
            export_id: export_id.to_string(),
            chunk_index,
            due_at,
        });
        self.save(&tasks)
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let mut tasks = self.lock()?;
        let removed = tasks.len();
        tasks.clear();
        self.save(&tasks)?;
        Ok(removed)
    }
}
