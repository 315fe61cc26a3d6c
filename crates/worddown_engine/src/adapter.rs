use engine_logging::{engine_debug, engine_warn};

use crate::error::AdapterError;
use crate::settings::ExportSettings;
use crate::ContentItem;

/// A content source that contributes extra markup to an item before sanitization.
pub trait Adapter: Send + Sync {
    /// Name used in settings (`adapters: {"name": false}`) and logs.
    fn name(&self) -> &str;

    /// Whether the backing integration is present at all. Not-installed adapters
    /// are never registered.
    fn installed(&self) -> bool {
        true
    }

    fn supports(&self, item: &ContentItem) -> bool;

    /// Return the new accumulated content. `content` is the output of the
    /// previously run adapters.
    fn inject(&self, content: &str, item: &ContentItem) -> Result<String, AdapterError>;
}

/// Ordered set of active adapters.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn Adapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every adapter in order, honouring installation and settings opt-outs.
    pub fn from_settings(settings: &ExportSettings, adapters: Vec<Box<dyn Adapter>>) -> Self {
        let mut registry = Self::new();
        for adapter in adapters {
            let enabled = settings.adapter_enabled(adapter.name());
            registry.register(adapter, enabled);
        }
        registry
    }

    /// Add `adapter` to the active set. Returns false when it was skipped.
    pub fn register(&mut self, adapter: Box<dyn Adapter>, enabled: bool) -> bool {
        if !adapter.installed() {
            engine_debug!("adapter {} not installed; skipping", adapter.name());
            return false;
        }
        if !enabled {
            engine_debug!("adapter {} disabled by settings", adapter.name());
            return false;
        }
        self.adapters.push(adapter);
        true
    }

    pub fn active_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Run supporting adapters in registration order. A failing adapter leaves the
    /// accumulated content as it was.
    pub fn inject_all(&self, content: &str, item: &ContentItem) -> String {
        let mut current = content.to_string();
        for adapter in &self.adapters {
            if !adapter.supports(item) {
                continue;
            }
            match adapter.inject(&current, item) {
                Ok(next) => current = next,
                Err(err) => {
                    engine_warn!(
                        "adapter {} failed for item {}: {}",
                        adapter.name(),
                        item.id,
                        err
                    );
                }
            }
        }
        current
    }
}
