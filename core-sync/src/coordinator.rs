//! # Sync Coordinator
//!
//! Reconciles the remote database against the local output directories.
//!
//! ## Workflow
//!
//! 1. Query records in the publishable status, oldest edit first
//! 2. Project every record and resolve its artifact path
//! 3. Scan the post directory: delete artifacts whose record is gone or
//!    renamed, and push keep-key values found locally back to the store
//! 4. Restrict to records edited after the watermark, when one is set
//! 5. Convert the remaining records concurrently and write their artifacts
//! 6. Report counts
//!
//! Only file-system failures on the output roots and a failed initial query
//! abort a pass. Everything else is logged and the pass carries on; a record
//! whose conversion fails is simply not counted as handled.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::SyncCoordinator;
//!
//! let coordinator = SyncCoordinator::new(settings, store, converter, fs)
//!     .with_uploader(uploader);
//! let outcome = coordinator.sync().await?;
//! println!("{} queried, {} handled, {} deleted", outcome.queried, outcome.handled, outcome.deleted);
//! ```

use bridge_traits::{
    content::{AssetUploader, ContentConverter},
    remote::{
        PropertyPatch, PropertyValue, RecordFilter, RecordQuery, RecordSort, RemoteRecord,
        RemoteStore, RichText, SelectOption, SortDirection,
    },
    storage::FileSystemAccess,
};
use core_runtime::config::SyncSettings;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::assets::{AssetRewriter, ExtensionImageMatcher};
use crate::error::{Result, SyncError};
use crate::local::{LocalArtifact, LocalStateReader};
use crate::path::{post_stem, string_field, PathResolver, ResolvedPath};
use crate::projector::{
    parse_timestamp, ProjectedProperties, RecordProjector, CREATED_TIME_KEY,
    LAST_EDITED_TIME_KEY, TITLE_KEY,
};
use crate::writer::ArtifactWriter;

/// Summary of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    /// Records returned by the query
    pub queried: usize,
    /// Records converted and written
    pub handled: usize,
    /// Local artifacts deleted
    pub deleted: usize,
}

/// A queried record with its projection and target path.
#[derive(Debug, Clone)]
struct PlannedRecord {
    record: RemoteRecord,
    properties: ProjectedProperties,
    path: ResolvedPath,
}

impl PlannedRecord {
    fn status<'a>(&'a self, settings: &SyncSettings) -> Option<&'a str> {
        self.properties
            .get(&settings.status.name)
            .and_then(|value| value.as_str())
    }
}

pub struct SyncCoordinator {
    settings: SyncSettings,
    store: Arc<dyn RemoteStore>,
    converter: Arc<dyn ContentConverter>,
    fs: Arc<dyn FileSystemAccess>,
    projector: RecordProjector,
    resolver: PathResolver,
    reader: LocalStateReader,
    writer: ArtifactWriter,
    assets: Option<AssetRewriter>,
}

impl SyncCoordinator {
    pub fn new(
        settings: SyncSettings,
        store: Arc<dyn RemoteStore>,
        converter: Arc<dyn ContentConverter>,
        fs: Arc<dyn FileSystemAccess>,
    ) -> Self {
        Self {
            projector: RecordProjector::new(settings.timezone),
            resolver: PathResolver::new(&settings.output),
            reader: LocalStateReader::new(fs.clone()),
            writer: ArtifactWriter::new(fs.clone()),
            assets: None,
            settings,
            store,
            converter,
            fs,
        }
    }

    /// Re-host images through `uploader`, skipping the configured prefixes.
    pub fn with_uploader(self, uploader: Arc<dyn AssetUploader>) -> Self {
        let matcher = ExtensionImageMatcher::new(self.settings.skip_prefixes.clone());
        self.with_asset_rewriter(AssetRewriter::new(uploader, Arc::new(matcher)))
    }

    pub fn with_asset_rewriter(mut self, rewriter: AssetRewriter) -> Self {
        self.assets = Some(rewriter);
        self
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Run one reconciliation pass.
    #[instrument(skip(self), fields(database_id = %self.settings.database_id))]
    pub async fn sync(&self) -> Result<SyncOutcome> {
        self.check_settings()?;

        info!("Phase 1: Querying remote records");
        let records = self
            .store
            .query(&self.build_query())
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))?;
        info!("Fetched {} records", records.len());

        info!("Phase 2: Projecting records");
        let mut planned: Vec<PlannedRecord> = records.into_iter().map(|r| self.plan(r)).collect();
        let queried = planned.len();

        info!("Phase 3: Scanning local artifacts");
        self.ensure_output_roots().await?;
        let deleted = self.reconcile_local(&mut planned).await?;

        info!("Phase 4: Selecting records to convert");
        let candidates = self.select_candidates(&planned);
        if candidates.is_empty() {
            info!("No records to convert");
            return Ok(SyncOutcome {
                queried,
                handled: 0,
                deleted,
            });
        }

        info!("Phase 5: Converting {} records", candidates.len());
        let results = join_all(candidates.iter().map(|planned| self.convert_record(planned))).await;

        let mut handled = 0;
        for (planned, result) in candidates.iter().zip(results) {
            match result {
                Ok(true) => handled += 1,
                Ok(false) => {}
                Err(e) => error!(record_id = %planned.record.id, error = %e, "Record conversion failed"),
            }
        }

        let outcome = SyncOutcome {
            queried,
            handled,
            deleted,
        };
        info!(
            queried = outcome.queried,
            handled = outcome.handled,
            deleted = outcome.deleted,
            "Sync pass completed"
        );
        Ok(outcome)
    }

    fn check_settings(&self) -> Result<()> {
        if self.settings.database_id.trim().is_empty() {
            return Err(SyncError::Config("database id is empty".to_string()));
        }
        if self.settings.status.name.trim().is_empty() {
            return Err(SyncError::Config("status property name is empty".to_string()));
        }
        Ok(())
    }

    fn build_query(&self) -> RecordQuery {
        let status = &self.settings.status;
        let published = RecordFilter::SelectEquals {
            property: status.name.clone(),
            value: status.published.clone(),
        };

        let filter = if status.publish_pending {
            RecordFilter::Or(vec![
                published,
                RecordFilter::SelectEquals {
                    property: status.name.clone(),
                    value: status.unpublish.clone(),
                },
            ])
        } else {
            published
        };

        RecordQuery::new(self.settings.database_id.clone())
            .filter(filter)
            .sort(RecordSort::LastEditedTime(SortDirection::Ascending))
    }

    fn plan(&self, record: RemoteRecord) -> PlannedRecord {
        let mut properties = self.projector.project(&record);
        let path = self.resolver.resolve(&properties);
        path.annotate(&mut properties);

        PlannedRecord {
            record,
            properties,
            path,
        }
    }

    async fn ensure_output_roots(&self) -> Result<()> {
        for root in [&self.settings.output.post, &self.settings.output.page] {
            self.fs
                .create_dir_all(root)
                .await
                .map_err(|e| SyncError::io(root, e))?;
        }
        Ok(())
    }

    /// Delete stale posts and back-propagate keep-keys. Returns the number of
    /// deleted artifacts.
    async fn reconcile_local(&self, planned: &mut [PlannedRecord]) -> Result<usize> {
        let post_root = &self.settings.output.post;
        let paths = self.reader.list_artifacts(post_root).await?;
        let artifacts = join_all(paths.iter().map(|path| self.reader.load(path))).await;

        let mut deleted = 0;
        for artifact in artifacts.into_iter().flatten() {
            let matched = artifact
                .id()
                .and_then(|id| planned.iter_mut().find(|p| p.record.id == id));

            let fresh = matched.as_ref().map(|p| self.projector.project(&p.record));

            if self.settings.output.clean_unpublished_post
                && is_stale(&artifact, fresh.as_ref())
            {
                self.fs
                    .delete_file(&artifact.path)
                    .await
                    .map_err(|e| SyncError::io(&artifact.path, e))?;
                info!(path = %artifact.path.display(), "Deleted unpublished artifact");
                deleted += 1;
                continue;
            }

            if let (Some(target), Some(fresh)) = (matched, fresh) {
                self.back_propagate(&artifact, target, &fresh).await;
            }
        }

        Ok(deleted)
    }

    /// Copy keep-key values from a local header into the record when the
    /// record declares the property but has no value for it. Sends at most
    /// one update.
    async fn back_propagate(
        &self,
        artifact: &LocalArtifact,
        planned: &mut PlannedRecord,
        fresh: &ProjectedProperties,
    ) {
        let record_id = planned.record.id.clone();
        let mut patch = PropertyPatch::new();

        for key in &self.settings.keys_to_keep {
            let Some(local_value) = artifact.text_value(key) else {
                continue;
            };
            if fresh.contains_key(key) {
                continue;
            }

            match planned.record.properties.get_mut(key) {
                Some(PropertyValue::RichText { rich_text }) => {
                    rich_text.push(RichText::plain(local_value));
                    patch.insert(
                        key.clone(),
                        PropertyValue::RichText {
                            rich_text: rich_text.clone(),
                        },
                    );
                }
                Some(_) => {
                    warn!(record_id = %record_id, key = %key, "Keep-key is not a rich text property, skipping");
                }
                None => {}
            }
        }

        if patch.is_empty() {
            return;
        }

        let keys: Vec<&String> = patch.keys().collect();
        match self.store.update(&record_id, &patch).await {
            Ok(()) => info!(record_id = %record_id, ?keys, "Back-propagated local values"),
            Err(e) => warn!(record_id = %record_id, ?keys, error = %e, "Failed to back-propagate local values"),
        }

        planned.properties = {
            let mut properties = self.projector.project(&planned.record);
            planned.path.annotate(&mut properties);
            properties
        };
    }

    fn is_publishable(&self, status: Option<&str>) -> bool {
        let settings = &self.settings.status;
        match status {
            Some(status) if status == settings.published => true,
            Some(status) => settings.publish_pending && status == settings.unpublish,
            None => false,
        }
    }

    fn select_candidates<'a>(&self, planned: &'a [PlannedRecord]) -> Vec<&'a PlannedRecord> {
        let Some(raw) = self.settings.watermark.as_deref().filter(|w| !w.trim().is_empty()) else {
            return planned.iter().collect();
        };

        let tz = self.settings.timezone;
        let Some(watermark) = parse_timestamp(raw, tz) else {
            error!(watermark = %raw, "The last sync datetime is not valid, nothing will be converted");
            return Vec::new();
        };

        info!("Only syncing records edited after {}", raw);
        planned
            .iter()
            .filter(|p| self.is_publishable(p.status(&self.settings)))
            .filter(|p| {
                parse_timestamp(&p.record.last_edited_time, tz).is_some_and(|edited| edited > watermark)
            })
            .collect()
    }

    #[instrument(skip_all, fields(record_id = %planned.record.id))]
    async fn convert_record(&self, planned: &PlannedRecord) -> Result<bool> {
        let status = planned.status(&self.settings);
        let title = string_field(&planned.properties, TITLE_KEY).unwrap_or_default();

        if planned.record.archived || !self.is_publishable(status) {
            info!(title = %title, "Record is gone or not published, skipping");
            return Ok(false);
        }

        if !self.fs.exists(&planned.path.file_path).await.unwrap_or(false) {
            info!(path = %planned.path.file_path.display(), "New artifact");
        }

        let output_dir = &planned.path.output_dir;
        self.fs
            .create_dir_all(output_dir)
            .await
            .map_err(|e| SyncError::io(output_dir, e))?;

        let mut record = planned.record.clone();
        if status == Some(self.settings.status.unpublish.as_str()) {
            self.mark_published(&mut record).await?;
        }

        let mut header = self.projector.project(&record);
        let mut body = self
            .converter
            .convert(&record.id)
            .await
            .map_err(|e| SyncError::conversion(&record.id, e))?;

        if self.settings.migrate_image {
            match &self.assets {
                Some(assets) => {
                    body = assets.rewrite_body(&body).await;
                    assets.rewrite_cover(&mut header).await;
                }
                None => warn!("Image migration is enabled but no uploader is configured"),
            }
        }

        header.remove(CREATED_TIME_KEY);
        header.remove(LAST_EDITED_TIME_KEY);

        self.writer
            .write(&planned.path.file_path, &header, &body)
            .await?;

        info!(title = %title, "Record converted");
        Ok(true)
    }

    /// Flip the status property to the published value, remotely and on the
    /// local copy.
    async fn mark_published(&self, record: &mut RemoteRecord) -> Result<()> {
        let name = &self.settings.status.name;
        let published = SelectOption::named(self.settings.status.published.clone());

        let value = match record.properties.get(name) {
            Some(PropertyValue::Status { .. }) => PropertyValue::Status {
                status: Some(published),
            },
            _ => PropertyValue::Select {
                select: Some(published),
            },
        };

        let mut patch = PropertyPatch::new();
        patch.insert(name.clone(), value.clone());
        self.store
            .update(&record.id, &patch)
            .await
            .map_err(|e| SyncError::conversion(&record.id, e))?;

        record.properties.insert(name.clone(), value);
        info!("Status set to {}", self.settings.status.published);
        Ok(())
    }
}

/// Whether a local post no longer corresponds to its record.
///
/// `fresh` is the unannotated projection of the record whose id the header
/// carries, if any record has it.
fn is_stale(artifact: &LocalArtifact, fresh: Option<&ProjectedProperties>) -> bool {
    let Some(fresh) = fresh else {
        debug!(path = %artifact.path.display(), "No record matches the artifact id");
        return true;
    };

    post_stem(fresh).as_deref() != Some(artifact.stem.as_str())
}
