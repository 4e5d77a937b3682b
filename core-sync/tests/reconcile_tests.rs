//! Integration tests for full reconciliation passes
//!
//! These tests drive `SyncCoordinator::sync` against an in-memory remote
//! store, a scripted converter and the real file system in a temp directory:
//! - Artifact creation and idempotent re-runs
//! - Deletion of orphaned and renamed posts, with and without cleanup
//! - Keep-key back-propagation
//! - Pending-to-published status transition
//! - Per-record failure isolation and watermark handling
//! - Image re-hosting

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::{
    content::{AssetUploader, ContentConverter},
    error::{BridgeError, Result as BridgeResult},
    remote::{
        FileObject, PropertyPatch, PropertyValue, RecordFilter, RecordQuery, RemoteRecord,
        RemoteStore, RichText, SelectOption,
    },
    storage::FileSystemAccess,
};
use core_runtime::config::{OutputDirs, StatusSettings, SyncSettings};
use core_sync::local::{parse_header, split_front_matter};
use core_sync::{ProjectedProperties, SyncCoordinator, SyncError, SyncOutcome};
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Mutex;

// ============================================================================
// Mock Implementations
// ============================================================================

/// In-memory database that evaluates filters and applies updates.
#[derive(Default)]
struct InMemoryStore {
    records: Mutex<Vec<RemoteRecord>>,
    updates: Mutex<Vec<(String, PropertyPatch)>>,
    fail_queries: bool,
}

impl InMemoryStore {
    fn with_records(records: Vec<RemoteRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    async fn updates(&self) -> Vec<(String, PropertyPatch)> {
        self.updates.lock().await.clone()
    }

    fn matches(filter: &RecordFilter, record: &RemoteRecord) -> bool {
        match filter {
            RecordFilter::SelectEquals { property, value } => {
                record.properties.get(property).and_then(|p| p.option_name()) == Some(value.as_str())
            }
            RecordFilter::Or(filters) => filters.iter().any(|f| Self::matches(f, record)),
        }
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn query(&self, query: &RecordQuery) -> BridgeResult<Vec<RemoteRecord>> {
        if self.fail_queries {
            return Err(BridgeError::OperationFailed("HTTP 503 error".to_string()));
        }

        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|r| query.filter.as_ref().map_or(true, |f| Self::matches(f, r)))
            .cloned()
            .collect())
    }

    async fn update(&self, record_id: &str, properties: &PropertyPatch) -> BridgeResult<()> {
        let mut records = self.records.lock().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| BridgeError::NotFound(record_id.to_string()))?;
        for (name, value) in properties {
            record.properties.insert(name.clone(), value.clone());
        }

        self.updates
            .lock()
            .await
            .push((record_id.to_string(), properties.clone()));
        Ok(())
    }
}

/// Returns a fixed body per record id; unknown ids fail.
struct ScriptedConverter {
    bodies: HashMap<String, String>,
}

impl ScriptedConverter {
    fn new(bodies: &[(&str, &str)]) -> Self {
        Self {
            bodies: bodies
                .iter()
                .map(|(id, body)| (id.to_string(), body.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl ContentConverter for ScriptedConverter {
    async fn convert(&self, record_id: &str) -> BridgeResult<String> {
        self.bodies
            .get(record_id)
            .cloned()
            .ok_or_else(|| BridgeError::OperationFailed(format!("HTTP 500 for {}", record_id)))
    }
}

/// Re-hosts `https://host/...` under `https://cdn/...`.
#[derive(Default)]
struct CdnUploader {
    uploads: Mutex<Vec<String>>,
}

#[async_trait]
impl AssetUploader for CdnUploader {
    async fn upload(&self, source_url: &str) -> BridgeResult<Option<String>> {
        self.uploads.lock().await.push(source_url.to_string());
        Ok(source_url
            .strip_prefix("https://host/")
            .map(|rest| format!("https://cdn/{}", rest)))
    }
}

// ============================================================================
// Test Utilities
// ============================================================================

struct Harness {
    dir: TempDir,
    store: Arc<InMemoryStore>,
}

impl Harness {
    fn new(records: Vec<RemoteRecord>) -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            store: Arc::new(InMemoryStore::with_records(records)),
        }
    }

    fn post_dir(&self) -> PathBuf {
        self.dir.path().join("posts")
    }

    fn page_dir(&self) -> PathBuf {
        self.dir.path().join("pages")
    }

    fn settings(&self) -> SyncSettings {
        SyncSettings::new(
            "db",
            StatusSettings {
                name: "status".to_string(),
                unpublish: "unpublish".to_string(),
                published: "published".to_string(),
                publish_pending: false,
            },
            OutputDirs {
                page: self.page_dir(),
                post: self.post_dir(),
                clean_unpublished_post: true,
            },
        )
    }

    fn coordinator(&self, settings: SyncSettings, converter: ScriptedConverter) -> SyncCoordinator {
        let fs: Arc<dyn FileSystemAccess> = Arc::new(TokioFileSystem::new());
        SyncCoordinator::new(settings, self.store.clone(), Arc::new(converter), fs)
    }

    fn write_post(&self, name: &str, content: &str) -> PathBuf {
        std::fs::create_dir_all(self.post_dir()).unwrap();
        let path = self.post_dir().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}

fn record(id: &str, title: &str, status: &str, edited: &str) -> RemoteRecord {
    RemoteRecord::new(id, "2023-01-01T00:00:00.000Z", edited)
        .with_property(
            "title",
            PropertyValue::Title {
                title: vec![RichText::plain(title)],
            },
        )
        .with_property("status", PropertyValue::select(status))
        .with_property("type", PropertyValue::select("post"))
}

fn published(id: &str, title: &str) -> RemoteRecord {
    record(id, title, "published", "2023-05-01T00:00:00.000Z")
}

fn read_header(path: &Path) -> ProjectedProperties {
    let raw = std::fs::read_to_string(path).unwrap();
    let (yaml, _) = split_front_matter(&raw);
    parse_header(yaml.expect("artifact has a header")).expect("header parses")
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_first_pass_writes_every_published_record() {
    let about = published("page-1", "About")
        .with_property("type", PropertyValue::select("page"))
        .with_property("filename", PropertyValue::rich_text("about"));
    let harness = Harness::new(vec![
        published("rec-1", "Hello"),
        published("rec-2", "World"),
        about,
        record("draft", "Draft", "draft", "2023-05-01T00:00:00.000Z"),
    ]);
    let converter = ScriptedConverter::new(&[
        ("rec-1", "Hello body"),
        ("rec-2", "World body"),
        ("page-1", "About me"),
    ]);

    let outcome = harness
        .coordinator(harness.settings(), converter)
        .sync()
        .await
        .unwrap();

    assert_eq!(
        outcome,
        SyncOutcome {
            queried: 3,
            handled: 3,
            deleted: 0
        }
    );

    let hello = harness.post_dir().join("Hello.md");
    let header = read_header(&hello);
    assert_eq!(header["id"], json!("rec-1"));
    assert_eq!(header["title"], json!("Hello"));
    assert_eq!(header["status"], json!("published"));
    assert!(!header.contains_key("created_time"));
    assert!(!header.contains_key("last_edited_time"));
    assert!(std::fs::read_to_string(&hello).unwrap().ends_with("\nHello body\n"));

    assert!(harness.page_dir().join("about").join("index.md").exists());
    assert!(!harness.post_dir().join("Draft.md").exists());
}

#[tokio::test]
async fn test_second_pass_is_idempotent() {
    let harness = Harness::new(vec![published("rec-1", "Hello"), published("rec-2", "World")]);
    let bodies = [("rec-1", "# Hi\n\nText"), ("rec-2", "Other")];

    let first = harness
        .coordinator(harness.settings(), ScriptedConverter::new(&bodies))
        .sync()
        .await
        .unwrap();
    let snapshot = std::fs::read_to_string(harness.post_dir().join("Hello.md")).unwrap();

    let second = harness
        .coordinator(harness.settings(), ScriptedConverter::new(&bodies))
        .sync()
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(second.deleted, 0);
    assert_eq!(
        std::fs::read_to_string(harness.post_dir().join("Hello.md")).unwrap(),
        snapshot
    );
    assert_eq!(std::fs::read_dir(harness.post_dir()).unwrap().count(), 2);
    assert!(harness.store.updates().await.is_empty());
}

#[tokio::test]
async fn test_untitled_post_keeps_its_id_named_artifact() {
    let untitled = RemoteRecord::new(
        "rec-9",
        "2023-01-01T00:00:00.000Z",
        "2023-05-01T00:00:00.000Z",
    )
    .with_property("status", PropertyValue::select("published"));
    let harness = Harness::new(vec![untitled]);
    let bodies = [("rec-9", "No name")];

    let first = harness
        .coordinator(harness.settings(), ScriptedConverter::new(&bodies))
        .sync()
        .await
        .unwrap();
    let artifact = harness.post_dir().join("rec-9.md");
    assert!(artifact.exists());

    let second = harness
        .coordinator(harness.settings(), ScriptedConverter::new(&bodies))
        .sync()
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(second.deleted, 0);
    assert!(artifact.exists());
    assert_eq!(std::fs::read_dir(harness.post_dir()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_orphaned_artifact_is_deleted_with_cleanup() {
    let harness = Harness::new(vec![published("rec-1", "Hello")]);
    let orphan = harness.write_post("Gone.md", "---\nid: ghost\ntitle: Gone\n---\n\nOld\n");
    let notes = harness.write_post("notes.md", "No header, hands off\n");
    let other = harness.write_post("readme.txt", "---\nid: ghost\n---\n");

    let outcome = harness
        .coordinator(harness.settings(), ScriptedConverter::new(&[("rec-1", "Body")]))
        .sync()
        .await
        .unwrap();

    assert_eq!(outcome.deleted, 1);
    assert!(!orphan.exists());
    assert!(notes.exists());
    assert!(other.exists());
}

#[tokio::test]
async fn test_orphaned_artifact_is_kept_without_cleanup() {
    let harness = Harness::new(vec![published("rec-1", "Hello")]);
    let orphan = harness.write_post("Gone.md", "---\nid: ghost\n---\n\nOld\n");

    let mut settings = harness.settings();
    settings.output.clean_unpublished_post = false;

    let outcome = harness
        .coordinator(settings, ScriptedConverter::new(&[("rec-1", "Body")]))
        .sync()
        .await
        .unwrap();

    assert_eq!(outcome.deleted, 0);
    assert!(orphan.exists());
}

#[tokio::test]
async fn test_renamed_record_replaces_old_artifact() {
    let renamed = published("rec-1", "Hello").with_property("filename", PropertyValue::rich_text("hello-world"));
    let harness = Harness::new(vec![renamed]);
    let old = harness.write_post("Hello.md", "---\nid: rec-1\ntitle: Hello\n---\n\nBody\n");

    let outcome = harness
        .coordinator(harness.settings(), ScriptedConverter::new(&[("rec-1", "Body")]))
        .sync()
        .await
        .unwrap();

    assert_eq!(outcome.deleted, 1);
    assert_eq!(outcome.handled, 1);
    assert!(!old.exists());
    assert!(harness.post_dir().join("hello-world.md").exists());
}

#[tokio::test]
async fn test_keep_key_is_back_propagated_once() {
    let with_slots = published("rec-1", "Hello")
        .with_property("abbrlink", PropertyValue::RichText { rich_text: vec![] })
        .with_property("summary", PropertyValue::rich_text("already set"));
    let harness = Harness::new(vec![with_slots]);
    harness.write_post(
        "Hello.md",
        "---\nid: rec-1\ntitle: Hello\nabbrlink: x\nsummary: local\nseries: undeclared\n---\n\nBody\n",
    );

    let settings = harness.settings().with_keys_to_keep(vec![
        "abbrlink".to_string(),
        "summary".to_string(),
        "series".to_string(),
    ]);
    harness
        .coordinator(settings, ScriptedConverter::new(&[("rec-1", "Body")]))
        .sync()
        .await
        .unwrap();

    let updates = harness.store.updates().await;
    assert_eq!(updates.len(), 1);
    let (record_id, patch) = &updates[0];
    assert_eq!(record_id, "rec-1");
    assert_eq!(patch.keys().collect::<Vec<_>>(), vec!["abbrlink"]);
    assert_eq!(patch["abbrlink"], PropertyValue::rich_text("x"));

    let header = read_header(&harness.post_dir().join("Hello.md"));
    assert_eq!(header["abbrlink"], json!("x"));
    assert_eq!(header["summary"], json!("already set"));
}

#[tokio::test]
async fn test_pending_record_is_published_once() {
    let pending = record("rec-1", "Hello", "unpublish", "2023-05-01T00:00:00.000Z");
    let harness = Harness::new(vec![pending]);

    let mut settings = harness.settings();
    settings.status.publish_pending = true;

    let outcome = harness
        .coordinator(settings, ScriptedConverter::new(&[("rec-1", "Body")]))
        .sync()
        .await
        .unwrap();

    assert_eq!(outcome.handled, 1);

    let updates = harness.store.updates().await;
    assert_eq!(updates.len(), 1);
    assert_eq!(
        updates[0].1["status"],
        PropertyValue::Select {
            select: Some(SelectOption::named("published"))
        }
    );

    let header = read_header(&harness.post_dir().join("Hello.md"));
    assert_eq!(header["status"], json!("published"));
}

#[tokio::test]
async fn test_pending_record_is_ignored_by_default() {
    let pending = record("rec-1", "Hello", "unpublish", "2023-05-01T00:00:00.000Z");
    let harness = Harness::new(vec![pending]);

    let outcome = harness
        .coordinator(harness.settings(), ScriptedConverter::new(&[("rec-1", "Body")]))
        .sync()
        .await
        .unwrap();

    assert_eq!(outcome, SyncOutcome::default());
    assert!(harness.store.updates().await.is_empty());
}

#[tokio::test]
async fn test_conversion_failure_is_isolated() {
    let harness = Harness::new(vec![
        published("rec-1", "Hello"),
        published("rec-2", "Broken"),
        published("rec-3", "World"),
    ]);
    let converter = ScriptedConverter::new(&[("rec-1", "a"), ("rec-3", "c")]);

    let outcome = harness
        .coordinator(harness.settings(), converter)
        .sync()
        .await
        .unwrap();

    assert_eq!(
        outcome,
        SyncOutcome {
            queried: 3,
            handled: 2,
            deleted: 0
        }
    );
    assert!(harness.post_dir().join("Hello.md").exists());
    assert!(!harness.post_dir().join("Broken.md").exists());
    assert!(harness.post_dir().join("World.md").exists());
}

#[tokio::test]
async fn test_invalid_watermark_converts_nothing() {
    let harness = Harness::new(vec![published("rec-1", "Hello")]);
    let settings = harness.settings().with_watermark("last tuesday");

    let outcome = harness
        .coordinator(settings, ScriptedConverter::new(&[("rec-1", "Body")]))
        .sync()
        .await
        .unwrap();

    assert_eq!(outcome.queried, 1);
    assert_eq!(outcome.handled, 0);
    assert!(!harness.post_dir().join("Hello.md").exists());
}

#[tokio::test]
async fn test_watermark_limits_conversion() {
    let harness = Harness::new(vec![
        record("old", "Old", "published", "2023-01-10T00:00:00.000Z"),
        record("new", "New", "published", "2023-03-10T00:00:00.000Z"),
    ]);
    let settings = harness.settings().with_watermark("2023-02-01T00:00:00Z");

    let outcome = harness
        .coordinator(settings, ScriptedConverter::new(&[("old", "a"), ("new", "b")]))
        .sync()
        .await
        .unwrap();

    assert_eq!(outcome.queried, 2);
    assert_eq!(outcome.handled, 1);
    assert!(harness.post_dir().join("New.md").exists());
    assert!(!harness.post_dir().join("Old.md").exists());
}

#[tokio::test]
async fn test_images_and_cover_are_rehosted() {
    let with_cover = published("rec-1", "Hello").with_cover(FileObject::external("https://host/cover.jpg"));
    let harness = Harness::new(vec![with_cover]);
    let uploader = Arc::new(CdnUploader::default());

    let settings = harness.settings().with_image_migration(true);
    let coordinator = harness
        .coordinator(
            settings,
            ScriptedConverter::new(&[("rec-1", "Intro\n\n![shot](https://host/a.png?sig=1)\n\n![local](./b.png)")]),
        )
        .with_uploader(uploader.clone());

    coordinator.sync().await.unwrap();

    let path = harness.post_dir().join("Hello.md");
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("![shot](https://cdn/a.png?sig=1)"));
    assert!(text.contains("![local](./b.png)"));
    assert_eq!(read_header(&path)["cover"], json!("https://cdn/cover.jpg"));
    assert_eq!(uploader.uploads.lock().await.len(), 2);
}

#[tokio::test]
async fn test_empty_properties_are_absent_from_header() {
    let sparse = published("rec-1", "Hello")
        .with_property("tags", PropertyValue::MultiSelect { multi_select: vec![] })
        .with_property("categories", PropertyValue::MultiSelect {
            multi_select: vec![SelectOption::named("tech")],
        });
    let harness = Harness::new(vec![sparse]);

    harness
        .coordinator(harness.settings(), ScriptedConverter::new(&[("rec-1", "Body")]))
        .sync()
        .await
        .unwrap();

    let header = read_header(&harness.post_dir().join("Hello.md"));
    assert!(!header.contains_key("tags"));
    assert_eq!(header["categories"], json!(["tech"]));
}

#[tokio::test]
async fn test_query_failure_aborts_pass() {
    let harness = Harness::new(vec![]);
    let store = Arc::new(InMemoryStore {
        fail_queries: true,
        ..Default::default()
    });
    let fs: Arc<dyn FileSystemAccess> = Arc::new(TokioFileSystem::new());
    let coordinator = SyncCoordinator::new(
        harness.settings(),
        store,
        Arc::new(ScriptedConverter::new(&[])),
        fs,
    );

    assert!(matches!(coordinator.sync().await, Err(SyncError::Remote(_))));
}

#[tokio::test]
async fn test_empty_status_property_is_rejected() {
    let harness = Harness::new(vec![published("rec-1", "Hello")]);
    let mut settings = harness.settings();
    settings.status.name = String::new();

    let result = harness
        .coordinator(settings, ScriptedConverter::new(&[("rec-1", "Hello body")]))
        .sync()
        .await;

    assert!(matches!(result, Err(SyncError::Config(_))));
    assert!(harness.store.updates().await.is_empty());
    assert!(!harness.post_dir().exists());
}
