//! Read-side view of the live export tree.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::directory::{DirectoryRole, ExportDirectory};
use crate::error::StoreError;
use crate::filename::parse_item_id;
use crate::ItemId;

/// One published Markdown file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub id: ItemId,
    pub item_type: String,
    pub title: String,
    pub permalink: Option<String>,
    pub filename: String,
    pub file_size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct DocMeta {
    title: String,
    permalink: Option<String>,
}

/// Live files of every listed type, ordered by type then filename. Files not
/// following the `-{id}.md` convention are skipped.
pub fn list_exported(
    directories: &ExportDirectory,
    item_types: &[String],
) -> Result<Vec<ExportedFile>, StoreError> {
    let mut files = Vec::new();
    for item_type in item_types {
        for entry in live_entries(directories, item_type)? {
            let content = fs::read_to_string(&entry.path)?;
            files.push(entry.describe(item_type, &content)?);
        }
    }
    Ok(files)
}

/// Content of the live file for `id`, searching the listed types in order.
/// Only the matching file is read.
pub fn read_exported(
    directories: &ExportDirectory,
    item_types: &[String],
    id: ItemId,
) -> Result<Option<(ExportedFile, String)>, StoreError> {
    for item_type in item_types {
        let found = live_entries(directories, item_type)?
            .into_iter()
            .find(|entry| entry.id == id);
        let Some(entry) = found else {
            continue;
        };
        let Some(content) = read_to_string_if_exists(&entry.path)? else {
            continue;
        };
        let file = entry.describe(item_type, &content)?;
        return Ok(Some((file, content)));
    }
    Ok(None)
}

struct LiveEntry {
    id: ItemId,
    filename: String,
    path: PathBuf,
}

impl LiveEntry {
    fn describe(self, item_type: &str, content: &str) -> Result<ExportedFile, StoreError> {
        let metadata = fs::metadata(&self.path)?;
        let meta = parse_doc(content);
        Ok(ExportedFile {
            id: self.id,
            item_type: item_type.to_string(),
            title: meta.title,
            permalink: meta.permalink,
            filename: self.filename,
            file_size: metadata.len(),
            last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        })
    }
}

/// Files in one live type directory that carry an item id, sorted by filename.
fn live_entries(
    directories: &ExportDirectory,
    item_type: &str,
) -> Result<Vec<LiveEntry>, StoreError> {
    let dir = directories.type_dir(DirectoryRole::Live, item_type);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(StoreError::Io(err)),
    };
    let mut live: Vec<LiveEntry> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .filter_map(|e| {
            let filename = e.file_name().to_string_lossy().into_owned();
            let id = parse_item_id(&filename)?;
            Some(LiveEntry {
                id,
                filename,
                path: e.path(),
            })
        })
        .collect();
    live.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(live)
}

fn read_to_string_if_exists(path: &Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(StoreError::Io(err)),
    }
}

fn parse_doc(content: &str) -> DocMeta {
    let mut meta = DocMeta::default();
    let mut lines = content.lines().peekable();
    if lines.next_if_eq(&"---").is_some() {
        for line in &mut lines {
            if line.trim() == "---" {
                break;
            }
            if let Some(value) = line.strip_prefix("permalink:") {
                meta.permalink = Some(unquote(value.trim()));
            }
        }
    }
    if let Some(title) = lines.find_map(|line| line.strip_prefix("# ")) {
        meta.title = title.trim().to_string();
    }
    meta
}

fn unquote(value: &str) -> String {
    match value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => value.to_string(),
    }
}
