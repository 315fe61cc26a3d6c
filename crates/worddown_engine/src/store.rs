//! Collaborator stores: where items come from and where batch state is kept.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::decode::decode_html;
use crate::error::{AdapterError, StoreError};
use crate::page_builder::{LayoutModule, LayoutSource, ModuleLayout, PageBuilderOptions};
use crate::persist::AtomicFileWriter;
use crate::{ContentItem, ItemId, ItemStatus};

pub trait ContentStore: Send + Sync {
    fn get_item(&self, id: ItemId) -> Result<Option<ContentItem>, StoreError>;

    /// Ids of items whose type and status are listed, in store order, at most `limit`.
    fn query_item_ids(
        &self,
        item_types: &[String],
        statuses: &[ItemStatus],
        limit: Option<usize>,
    ) -> Result<Vec<ItemId>, StoreError>;
}

/// Generic key/value persistence for batch records and summaries.
pub trait StatusStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

pub fn read_record<T: DeserializeOwned>(
    store: &dyn StatusStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    store
        .get(key)?
        .map(|text| ron::from_str(&text).map_err(|e| StoreError::Parse(format!("{key}: {e}"))))
        .transpose()
}

pub fn write_record<T: Serialize>(
    store: &dyn StatusStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let text = ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())
        .map_err(|e| StoreError::Serialize(e.to_string()))?;
    store.put(key, &text)
}

#[derive(Debug, Clone, Deserialize)]
struct ItemRecord {
    id: ItemId,
    #[serde(rename = "type")]
    item_type: String,
    title: String,
    #[serde(default)]
    slug: String,
    #[serde(default = "default_status")]
    status: ItemStatus,
    created_at: NaiveDateTime,
    modified_at: NaiveDateTime,
    #[serde(default)]
    excerpt: String,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    content_html: Option<String>,
    #[serde(default)]
    content_file: Option<PathBuf>,
    #[serde(default)]
    charset: Option<String>,
    #[serde(default)]
    layout: Option<ModuleLayout>,
}

fn default_status() -> ItemStatus {
    ItemStatus::Publish
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    page_builder: Option<PageBuilderOptions>,
    items: Vec<ItemRecord>,
}

/// Content store backed by a JSON manifest of item records.
///
/// Item bodies are inline (`content_html`) or in a separate file (`content_file`,
/// relative to the manifest) decoded on read. A top-level `page_builder` section
/// makes the store a [`LayoutSource`] for the page-builder adapter.
#[derive(Debug)]
pub struct ManifestContentStore {
    base_dir: PathBuf,
    items: Vec<ItemRecord>,
    page_builder: Option<PageBuilderOptions>,
}

impl ManifestContentStore {
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let text = fs::read_to_string(path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_json(&text, base_dir)
    }

    pub fn from_json(json: &str, base_dir: PathBuf) -> Result<Self, StoreError> {
        let manifest: Manifest =
            serde_json::from_str(json).map_err(|e| StoreError::Parse(e.to_string()))?;
        Ok(Self {
            base_dir,
            items: manifest.items,
            page_builder: manifest.page_builder,
        })
    }

    /// In-memory store over ready-made items.
    pub fn from_items(items: Vec<ContentItem>) -> Self {
        let items = items
            .into_iter()
            .map(|item| ItemRecord {
                id: item.id,
                item_type: item.item_type,
                title: item.title,
                slug: item.slug,
                status: item.status,
                created_at: item.created_at,
                modified_at: item.modified_at,
                excerpt: item.excerpt,
                categories: item.categories,
                permalink: item.permalink,
                content_html: Some(item.raw_content_html),
                content_file: None,
                charset: None,
                layout: None,
            })
            .collect();
        Self {
            base_dir: PathBuf::new(),
            items,
            page_builder: None,
        }
    }

    pub fn with_page_builder(
        mut self,
        options: PageBuilderOptions,
        layouts: BTreeMap<ItemId, ModuleLayout>,
    ) -> Self {
        for record in &mut self.items {
            if let Some(layout) = layouts.get(&record.id) {
                record.layout = Some(layout.clone());
            }
        }
        self.page_builder = Some(options);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn record(&self, id: ItemId) -> Option<&ItemRecord> {
        self.items.iter().find(|record| record.id == id)
    }

    fn load_content(&self, record: &ItemRecord) -> Result<String, StoreError> {
        if let Some(html) = &record.content_html {
            return Ok(html.clone());
        }
        let Some(file) = &record.content_file else {
            return Ok(String::new());
        };
        let bytes = fs::read(self.base_dir.join(file))?;
        let decoded = decode_html(&bytes, record.charset.as_deref())
            .map_err(|e| StoreError::Parse(format!("{}: {e}", file.display())))?;
        Ok(decoded.html)
    }
}

impl ContentStore for ManifestContentStore {
    fn get_item(&self, id: ItemId) -> Result<Option<ContentItem>, StoreError> {
        let Some(record) = self.record(id) else {
            return Ok(None);
        };
        let raw_content_html = self.load_content(record)?;
        Ok(Some(ContentItem {
            id: record.id,
            item_type: record.item_type.clone(),
            title: record.title.clone(),
            raw_content_html,
            slug: record.slug.clone(),
            status: record.status,
            created_at: record.created_at,
            modified_at: record.modified_at,
            excerpt: record.excerpt.clone(),
            categories: record.categories.clone(),
            permalink: record.permalink.clone(),
        }))
    }

    fn query_item_ids(
        &self,
        item_types: &[String],
        statuses: &[ItemStatus],
        limit: Option<usize>,
    ) -> Result<Vec<ItemId>, StoreError> {
        Ok(self
            .items
            .iter()
            .filter(|r| item_types.contains(&r.item_type) && statuses.contains(&r.status))
            .map(|r| r.id)
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }
}

impl LayoutSource for ManifestContentStore {
    fn available(&self) -> bool {
        self.page_builder.is_some()
    }

    fn layout(&self, item_id: ItemId) -> Option<ModuleLayout> {
        self.record(item_id).and_then(|r| r.layout.clone())
    }

    fn options(&self) -> PageBuilderOptions {
        self.page_builder.clone().unwrap_or_default()
    }

    fn render_module(&self, module: &LayoutModule) -> Result<String, AdapterError> {
        module.html.clone().ok_or_else(|| AdapterError::Render {
            module: module.module_type.clone(),
            message: "module has no stored markup".to_string(),
        })
    }
}

/// One `{key}.ron` file per key under a state directory.
#[derive(Debug, Clone)]
pub struct FileStatusStore {
    dir: PathBuf,
}

impl FileStatusStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.ron")))
    }
}

fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        && !key.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(StoreError::Parse(format!("invalid status key {key:?}")))
    }
}

impl StatusStore for FileStatusStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        AtomicFileWriter::new(self.dir.clone()).write(&filename, value)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::Io(err)),
        };
        let mut keys: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                e.file_name()
                    .to_str()
                    .and_then(|name| name.strip_suffix(".ron"))
                    .map(str::to_string)
            })
            .filter(|key| key.starts_with(prefix))
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// In-memory [`StatusStore`].
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Io(io::Error::other("status store lock poisoned")))
    }
}

impl StatusStore for MemoryStatusStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .lock()?
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}
