use crate::core::config_store::ConfigStore;
use crate::core::folder_resolver::{self, ResolvedPath};
use crate::core::scanner;
use crate::models::config::{ShareScope, UploaderConfig};
use crate::models::image::LocalImage;
use crate::providers::traits::{RemoteStorage, SearchQuery};
use crate::utils::error::{Result, UploaderError};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;

/// One reconciliation pass, as driven by the poll loop.
#[async_trait]
pub trait UploadPass: Send {
    async fn run_pass(&mut self) -> Result<PassReport>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStatus {
    /// Today's date directory does not exist yet.
    NoScanDirectory,
    NoImages,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub status: PassStatus,
    pub uploaded: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
    /// Grouping that became shared during this pass.
    pub shared: Option<String>,
}

impl PassReport {
    fn idle(status: PassStatus) -> Self {
        Self {
            status,
            uploaded: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            shared: None,
        }
    }
}

/// Uploads the newest images of the scan directory and shares their folder.
pub struct UploadEngine {
    storage: Arc<dyn RemoteStorage>,
    config: UploaderConfig,
    store: ConfigStore,
}

impl UploadEngine {
    pub fn new(storage: Arc<dyn RemoteStorage>, config: UploaderConfig, store: ConfigStore) -> Self {
        Self {
            storage,
            config,
            store,
        }
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    /// Run a pass for the given calendar day.
    pub async fn run_pass_for(&mut self, today: NaiveDate) -> Result<PassReport> {
        let Some((scan_path, segments)) = self.resolve_scan_path(today)? else {
            return Ok(PassReport::idle(PassStatus::NoScanDirectory));
        };

        let images = scanner::latest_images(&scan_path, self.config.n_last_images).await?;
        if images.is_empty() {
            return Ok(PassReport::idle(PassStatus::NoImages));
        }

        let names: Vec<&str> = images.iter().map(|i| i.name.as_str()).collect();
        tracing::info!("Newest images are {:?}", names);

        let mut report = PassReport::idle(PassStatus::Completed);
        let (pending, done): (Vec<&LocalImage>, Vec<&LocalImage>) = images
            .iter()
            .partition(|image| !self.config.is_uploaded(&image.name));

        for image in &done {
            tracing::info!("Image {} already uploaded, will skip this one.", image.name);
            report.skipped.push(image.name.clone());
        }

        if !pending.is_empty() {
            let resolved = match folder_resolver::resolve_path(self.storage.as_ref(), &segments).await {
                Ok(resolved) => resolved,
                Err(e) => {
                    self.store.save(&self.config)?;
                    return Err(UploaderError::PassAborted(format!(
                        "Could not resolve remote folder {}: {}",
                        segments.join("/"),
                        e
                    )));
                }
            };

            for image in pending {
                match self.storage.upload_file(&image.path, resolved.target_id()).await {
                    Ok(_) => report.uploaded.push(image.name.clone()),
                    Err(e) => {
                        tracing::warn!("Unable to upload image {}: {}", image.path.display(), e);
                        report.failed.push(image.name.clone());
                    }
                }
            }

            report.shared = self.share_if_needed(&resolved).await;
        }

        // Only this pass's candidates are remembered; failed uploads stay out so they are retried
        self.config.latest_uploaded = images
            .iter()
            .filter(|image| report.skipped.contains(&image.name) || report.uploaded.contains(&image.name))
            .map(|image| image.name.clone())
            .collect();

        self.store.save(&self.config)?;

        tracing::info!(
            "Upload pass completed: uploaded={}, skipped={}, failed={}",
            report.uploaded.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// The local directory to scan and the remote folder segments it maps to.
    fn resolve_scan_path(&self, today: NaiveDate) -> Result<Option<(PathBuf, Vec<String>)>> {
        let root = &self.config.search_directory;

        if self.config.date_directory {
            return Ok(scanner::date_directory(root, today).map(|path| (path, scanner::date_segments(today))));
        }

        if !root.is_dir() {
            tracing::warn!("Directory {} does not yet exist...", root.display());
            return Ok(None);
        }

        let folder_name = root
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                UploaderError::InvalidConfig(format!(
                    "Search directory {} has no usable folder name",
                    root.display()
                ))
            })?;

        Ok(Some((root.clone(), vec![folder_name.to_string()])))
    }

    /// Grant every recipient access to the current grouping unless it is already shared.
    /// Returns the grouping when it became shared in this call.
    async fn share_if_needed(&mut self, resolved: &ResolvedPath) -> Option<String> {
        let index = match self.config.share_scope {
            ShareScope::Year => 0,
            ShareScope::Folder => resolved.segments.len().checked_sub(1)?,
        };
        let grouping = match self.config.share_scope {
            ShareScope::Year => resolved.segments.first()?.name.clone(),
            ShareScope::Folder => resolved
                .segments
                .iter()
                .map(|folder| folder.name.as_str())
                .collect::<Vec<_>>()
                .join("/"),
        };

        if self.config.is_shared(&grouping) {
            tracing::debug!("Folder {} already shared", grouping);
            return None;
        }
        if self.config.share_with.is_empty() {
            tracing::info!("No recipients configured, folder {} stays private", grouping);
            return None;
        }

        let folder_name = &resolved.segments[index].name;
        let query = SearchQuery::folders()
            .named(folder_name)
            .in_parent(resolved.parent_of(index));
        let folders = match self.storage.find(&query).await {
            Ok(found) => found,
            Err(e) => {
                tracing::error!("Could not look up folder {} for sharing: {}", grouping, e);
                return None;
            }
        };

        if folders.is_empty() {
            tracing::warn!("Folder {} not found remotely, cannot share it", grouping);
            return None;
        }

        tracing::info!("Folder {} not yet shared, sharing it now", grouping);

        let mut all_granted = true;
        'grants: for folder in &folders {
            for email in &self.config.share_with {
                if let Err(e) = self.storage.grant_access(&folder.id, email).await {
                    tracing::error!("Unable to set permissions on {} for {}: {}", folder.id, email, e);
                    all_granted = false;
                    break 'grants;
                }
            }
        }

        if all_granted {
            self.config.mark_shared(&grouping);
            Some(grouping)
        } else {
            self.config.clear_shared(&grouping);
            tracing::warn!("Sharing folder {} failed, will retry on the next pass", grouping);
            None
        }
    }
}

#[async_trait]
impl UploadPass for UploadEngine {
    async fn run_pass(&mut self) -> Result<PassReport> {
        let today = chrono::Local::now().date_naive();
        self.run_pass_for(today).await
    }
}

/// Permanently delete every folder in the remote store. Administrative cleanup only.
/// Returns how many folders were deleted.
pub async fn purge_folders(storage: &dyn RemoteStorage) -> Result<usize> {
    let folders = storage.find(&SearchQuery::folders()).await?;
    let mut deleted = 0;

    for folder in folders {
        match storage.delete_object(&folder.id).await {
            Ok(()) => deleted += 1,
            Err(e) => tracing::error!("Could not delete folder {} ({}): {}", folder.name, folder.id, e),
        }
    }

    tracing::info!("Purged {} folders from {}", deleted, storage.name());
    Ok(deleted)
}
