use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::adapter::AdapterRegistry;
use crate::convert::MarkdownConverter;
use crate::directory::ExportDirectory;
use crate::hooks::{ExportHooks, NoopHooks};
use crate::sanitize::ContentSanitizer;
use crate::scheduler::Scheduler;
use crate::settings::ExportSettings;
use crate::store::{ContentStore, StatusStore};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Every service the exporter needs, built once at startup and passed in.
pub struct ExportContext {
    pub settings: ExportSettings,
    pub directories: ExportDirectory,
    pub adapters: AdapterRegistry,
    pub sanitizer: Arc<ContentSanitizer>,
    pub converter: Arc<MarkdownConverter>,
    pub content: Arc<dyn ContentStore>,
    pub status: Arc<dyn StatusStore>,
    pub scheduler: Arc<dyn Scheduler>,
    pub hooks: Arc<dyn ExportHooks>,
    pub clock: Clock,
}

impl ExportContext {
    /// Context with the default sanitizer (settings denylist), converter, no adapters,
    /// no-op hooks and the system clock.
    pub fn new(
        settings: ExportSettings,
        directories: ExportDirectory,
        content: Arc<dyn ContentStore>,
        status: Arc<dyn StatusStore>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let sanitizer = ContentSanitizer::new(settings.denylisted_classes.clone());
        Self {
            settings,
            directories,
            adapters: AdapterRegistry::new(),
            sanitizer: Arc::new(sanitizer),
            converter: Arc::new(MarkdownConverter::default()),
            content,
            status,
            scheduler,
            hooks: Arc::new(NoopHooks),
            clock: system_clock(),
        }
    }

    pub fn with_adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = adapters;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ExportHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}
