use std::fs;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use worddown_engine::page_builder::LayoutSource;
use worddown_engine::{
    load_settings, read_record, write_record, ContentStore, ExportSettings, FileStatusStore,
    ItemStatus, ManifestContentStore, MemoryStatusStore, SettingsError, StatusStore, StoreError,
    MAX_CHUNK_SIZE, MIN_CHUNK_SIZE,
};

#[test]
fn missing_settings_file_gives_defaults() {
    let temp = TempDir::new().unwrap();
    let settings = load_settings(&temp.path().join("absent.ron")).unwrap();
    assert_eq!(settings, ExportSettings::default());
    assert_eq!(settings.export_post_types, vec!["post", "page"]);
    assert_eq!(settings.chunk_size, 50);
    assert_eq!(settings.chunk_delay_secs, 2);
    assert_eq!(settings.history_limit, 5);
    assert_eq!(settings.denylisted_classes, vec!["u-preloader"]);
    assert_eq!(settings.statuses(), vec![ItemStatus::Publish]);
}

#[test]
fn partial_settings_file_keeps_other_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("worddown.ron");
    fs::write(
        &path,
        r#"(export_post_types: ["page"], include_drafts: true, chunk_size: 5000, adapters: {"page_builder": false})"#,
    )
    .unwrap();

    let settings = load_settings(&path).unwrap();
    assert_eq!(settings.export_post_types, vec!["page"]);
    assert_eq!(settings.effective_chunk_size(), MAX_CHUNK_SIZE);
    assert_eq!(
        settings.statuses(),
        vec![ItemStatus::Publish, ItemStatus::Draft, ItemStatus::Pending]
    );
    assert!(!settings.adapter_enabled("page_builder"));
    assert!(settings.adapter_enabled("other"));
    assert_eq!(settings.conversion_timeout_secs, 30);
}

#[test]
fn chunk_size_is_clamped_to_bounds() {
    let small = ExportSettings {
        chunk_size: 1,
        ..ExportSettings::default()
    };
    assert_eq!(small.effective_chunk_size(), MIN_CHUNK_SIZE);
    let normal = ExportSettings {
        chunk_size: 75,
        ..ExportSettings::default()
    };
    assert_eq!(normal.effective_chunk_size(), 75);
}

#[test]
fn private_items_need_their_own_switch() {
    let settings = ExportSettings {
        include_private: true,
        ..ExportSettings::default()
    };
    assert_eq!(
        settings.statuses(),
        vec![ItemStatus::Publish, ItemStatus::Private]
    );
}

#[test]
fn api_key_must_be_configured_and_match() {
    let mut settings = ExportSettings::default();
    assert!(!settings.accepts_api_key(""));
    settings.api_key = "s3cret".to_string();
    assert!(settings.accepts_api_key("s3cret"));
    assert!(!settings.accepts_api_key("other"));
}

#[test]
fn malformed_settings_are_a_parse_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("worddown.ron");
    fs::write(&path, "(chunk_size: \"many\")").unwrap();
    assert!(matches!(load_settings(&path), Err(SettingsError::Parse(_))));
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Sample {
    name: String,
    count: u32,
}

#[test]
fn file_status_store_round_trips_records() {
    let temp = TempDir::new().unwrap();
    let store = FileStatusStore::new(temp.path().join("state"));
    assert_eq!(store.get("worddown_last_export").unwrap(), None);

    let sample = Sample {
        name: "a".to_string(),
        count: 2,
    };
    write_record(&store, "worddown_export_status_b", &sample).unwrap();
    write_record(&store, "worddown_export_status_a", &sample).unwrap();
    write_record(&store, "other", &sample).unwrap();

    assert_eq!(
        read_record::<Sample>(&store, "worddown_export_status_a").unwrap(),
        Some(sample)
    );
    assert_eq!(
        store.keys_with_prefix("worddown_export_status_").unwrap(),
        vec!["worddown_export_status_a", "worddown_export_status_b"]
    );

    store.delete("worddown_export_status_a").unwrap();
    store.delete("worddown_export_status_a").unwrap();
    assert_eq!(store.get("worddown_export_status_a").unwrap(), None);
}

#[test]
fn file_status_store_rejects_path_like_keys() {
    let temp = TempDir::new().unwrap();
    let store = FileStatusStore::new(temp.path().to_path_buf());
    assert!(matches!(store.put("../escape", "x"), Err(StoreError::Parse(_))));
    assert!(matches!(store.get(""), Err(StoreError::Parse(_))));
}

#[test]
fn corrupt_record_is_a_parse_error() {
    let store = MemoryStatusStore::new();
    store.put("broken", "(name: ").unwrap();
    assert!(matches!(
        read_record::<Sample>(&store, "broken"),
        Err(StoreError::Parse(_))
    ));
}

const MANIFEST: &str = r#"{
  "page_builder": {
    "enabled_modules": ["mod-text"],
    "enabled_areas": {"default": ["right-sidebar"]}
  },
  "items": [
    {
      "id": 1,
      "type": "page",
      "title": "Inline",
      "created_at": "2024-01-01T12:00:00",
      "modified_at": "2024-01-02T08:00:00",
      "content_html": "<p>inline</p>",
      "layout": {"areas": [{"name": "right-sidebar", "modules": [{"module_type": "mod-text", "html": "<p>side</p>"}]}]}
    },
    {
      "id": 2,
      "type": "post",
      "title": "From file",
      "status": "draft",
      "created_at": "2024-01-01T12:00:00",
      "modified_at": "2024-01-01T12:00:00",
      "content_file": "bodies/two.html",
      "charset": "iso-8859-1"
    },
    {
      "id": 3,
      "type": "page",
      "title": "Empty",
      "created_at": "2024-01-01T12:00:00",
      "modified_at": "2024-01-01T12:00:00"
    }
  ]
}"#;

fn manifest_dir() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("bodies")).unwrap();
    fs::write(temp.path().join("bodies").join("two.html"), b"<p>caf\xe9</p>").unwrap();
    fs::write(temp.path().join("manifest.json"), MANIFEST).unwrap();
    temp
}

#[test]
fn manifest_items_load_with_defaults_and_decoded_files() {
    let temp = manifest_dir();
    let store = ManifestContentStore::from_file(&temp.path().join("manifest.json")).unwrap();
    assert_eq!(store.len(), 3);

    let first = store.get_item(1).unwrap().unwrap();
    assert_eq!(first.raw_content_html, "<p>inline</p>");
    assert_eq!(first.status, ItemStatus::Publish);
    assert_eq!(first.slug, "");

    let second = store.get_item(2).unwrap().unwrap();
    assert_eq!(second.raw_content_html, "<p>café</p>");
    assert_eq!(second.status, ItemStatus::Draft);

    assert_eq!(store.get_item(3).unwrap().unwrap().raw_content_html, "");
    assert_eq!(store.get_item(42).unwrap(), None);
}

#[test]
fn manifest_query_filters_by_type_and_status() {
    let temp = manifest_dir();
    let store = ManifestContentStore::from_file(&temp.path().join("manifest.json")).unwrap();
    let types = vec!["post".to_string(), "page".to_string()];

    assert_eq!(
        store
            .query_item_ids(&types, &[ItemStatus::Publish], None)
            .unwrap(),
        vec![1, 3]
    );
    assert_eq!(
        store
            .query_item_ids(&types, &[ItemStatus::Publish, ItemStatus::Draft], Some(2))
            .unwrap(),
        vec![1, 2]
    );
}

#[test]
fn manifest_page_builder_section_provides_layouts() {
    let temp = manifest_dir();
    let store = ManifestContentStore::from_file(&temp.path().join("manifest.json")).unwrap();

    assert!(store.available());
    let layout = store.layout(1).unwrap();
    assert_eq!(layout.template, "default");
    assert_eq!(layout.areas[0].modules[0].html.as_deref(), Some("<p>side</p>"));
    assert_eq!(store.layout(3), None);
    assert_eq!(store.options().enabled_modules, vec!["mod-text"]);
}

#[test]
fn missing_content_file_is_a_store_error() {
    let json = r#"{"items": [{"id": 9, "type": "page", "title": "Gone",
        "created_at": "2024-01-01T00:00:00", "modified_at": "2024-01-01T00:00:00",
        "content_file": "nowhere.html"}]}"#;
    let store = ManifestContentStore::from_json(json, PathBuf::from("/nonexistent-worddown")).unwrap();
    assert!(matches!(store.get_item(9), Err(StoreError::Io(_))));
    assert!(matches!(
        ManifestContentStore::from_json("{\"items\": 3}", PathBuf::new()),
        Err(StoreError::Parse(_))
    ));
}
