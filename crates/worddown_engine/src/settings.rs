use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::sanitize::DEFAULT_DENYLISTED_CLASSES;
use crate::ItemStatus;

pub const MIN_CHUNK_SIZE: usize = 10;
pub const MAX_CHUNK_SIZE: usize = 200;

/// Export configuration. Every field is optional in the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub export_post_types: Vec<String>,
    pub include_drafts: bool,
    pub include_private: bool,
    pub chunk_size: usize,
    pub api_key: String,
    pub denylisted_classes: Vec<String>,
    /// Per-adapter switch; adapters missing here are enabled.
    pub adapters: BTreeMap<String, bool>,
    pub include_page_builder: bool,
    pub chunk_delay_secs: u64,
    /// Upper bound on sanitize + convert per item. `0` disables the bound.
    pub conversion_timeout_secs: u64,
    pub history_limit: usize,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            export_post_types: vec!["post".to_string(), "page".to_string()],
            include_drafts: false,
            include_private: false,
            chunk_size: 50,
            api_key: String::new(),
            denylisted_classes: DEFAULT_DENYLISTED_CLASSES
                .iter()
                .map(|c| c.to_string())
                .collect(),
            adapters: BTreeMap::new(),
            include_page_builder: false,
            chunk_delay_secs: 2,
            conversion_timeout_secs: 30,
            history_limit: worddown_core::DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl ExportSettings {
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
    }

    /// Item statuses eligible for export.
    pub fn statuses(&self) -> Vec<ItemStatus> {
        let mut statuses = vec![ItemStatus::Publish];
        if self.include_drafts {
            statuses.extend([ItemStatus::Draft, ItemStatus::Pending]);
        }
        if self.include_private {
            statuses.push(ItemStatus::Private);
        }
        statuses
    }

    pub fn adapter_enabled(&self, name: &str) -> bool {
        self.adapters.get(name).copied().unwrap_or(true)
    }

    pub fn accepts_api_key(&self, key: &str) -> bool {
        !self.api_key.is_empty() && self.api_key == key
    }
}

/// Load settings from a RON file. A missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<ExportSettings, SettingsError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(ExportSettings::default()),
        Err(err) => return Err(SettingsError::Io(err)),
    };
    ron::from_str(&text).map_err(|e| SettingsError::Parse(e.to_string()))
}
