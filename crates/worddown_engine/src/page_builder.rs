//! Page-builder adapter: splices rendered layout modules around an item's content.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::adapter::Adapter;
use crate::error::AdapterError;
use crate::{ContentItem, ItemId};

pub const PAGE_BUILDER_ADAPTER: &str = "page_builder";
pub const MAIN_CONTENT_AREA: &str = "main-content";

/// Canonical zone order; anything else sorts after these, keeping its layout order.
pub const ZONE_ORDER: &[&str] = &[
    "slider-area",
    MAIN_CONTENT_AREA,
    "top-sidebar",
    "above-columns-sidebar",
    "left-sidebar",
    "left-sidebar-bottom",
    "content-area-top",
    "content-area",
    "content-area-bottom",
    "right-sidebar",
];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModuleLayout {
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default)]
    pub areas: Vec<LayoutArea>,
}

fn default_template() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutArea {
    pub name: String,
    #[serde(default)]
    pub modules: Vec<LayoutModule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutModule {
    pub module_type: String,
    #[serde(default)]
    pub hidden: bool,
    /// Pre-rendered markup, when the layout source stores it.
    #[serde(default)]
    pub html: Option<String>,
}

/// Site-wide page-builder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageBuilderOptions {
    #[serde(default)]
    pub enabled_modules: Vec<String>,
    /// Enabled zone names per template.
    #[serde(default)]
    pub enabled_areas: BTreeMap<String, Vec<String>>,
}

/// Where layouts, options and module markup come from.
pub trait LayoutSource: Send + Sync {
    fn available(&self) -> bool;
    fn layout(&self, item_id: ItemId) -> Option<ModuleLayout>;
    fn options(&self) -> PageBuilderOptions;
    fn render_module(&self, module: &LayoutModule) -> Result<String, AdapterError>;
}

pub struct PageBuilderAdapter {
    source: Arc<dyn LayoutSource>,
    include: bool,
}

impl PageBuilderAdapter {
    /// `include` mirrors the `include_page_builder` setting.
    pub fn new(source: Arc<dyn LayoutSource>, include: bool) -> Self {
        Self { source, include }
    }
}

impl Adapter for PageBuilderAdapter {
    fn name(&self) -> &str {
        PAGE_BUILDER_ADAPTER
    }

    fn installed(&self) -> bool {
        self.source.available()
    }

    fn supports(&self, item: &ContentItem) -> bool {
        self.include
            && self.source.available()
            && self
                .source
                .layout(item.id)
                .is_some_and(|layout| !layout.areas.is_empty())
    }

    fn inject(&self, content: &str, item: &ContentItem) -> Result<String, AdapterError> {
        let mut layout = self
            .source
            .layout(item.id)
            .ok_or(AdapterError::MissingLayout(item.id))?;
        // The content always lands in the main-content slot, declared or not.
        if !layout.areas.iter().any(|a| a.name == MAIN_CONTENT_AREA) {
            layout.areas.push(LayoutArea {
                name: MAIN_CONTENT_AREA.to_string(),
                modules: Vec::new(),
            });
        }
        let options = self.source.options();
        let enabled_areas = options
            .enabled_areas
            .get(&layout.template)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut assembled = String::new();
        for area in ordered_areas(&layout.areas) {
            if area.name == MAIN_CONTENT_AREA {
                assembled.push_str(content);
                assembled.push_str("\n\n");
                continue;
            }
            if !enabled_areas.iter().any(|name| *name == area.name) {
                continue;
            }
            for module in &area.modules {
                if module.hidden || !options.enabled_modules.contains(&module.module_type) {
                    continue;
                }
                let html = self.source.render_module(module)?;
                if !html.trim().is_empty() {
                    assembled.push_str(&html);
                    assembled.push_str("\n\n");
                }
            }
        }
        Ok(assembled)
    }
}

/// Areas sorted by [`ZONE_ORDER`]; unknown zones last, stable among themselves.
pub fn ordered_areas(areas: &[LayoutArea]) -> Vec<&LayoutArea> {
    let mut ordered: Vec<&LayoutArea> = areas.iter().collect();
    ordered.sort_by_key(|area| zone_rank(&area.name));
    ordered
}

fn zone_rank(name: &str) -> usize {
    ZONE_ORDER
        .iter()
        .position(|zone| *zone == name)
        .unwrap_or(ZONE_ORDER.len())
}
