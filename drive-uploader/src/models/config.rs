use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which grouping is shared with the recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareScope {
    /// The top-level remote folder (the year in dated mode).
    Year,
    /// The folder the images are uploaded into.
    Folder,
}

impl ShareScope {
    pub fn as_str(&self) -> &str {
        match self {
            ShareScope::Year => "year",
            ShareScope::Folder => "folder",
        }
    }
}

impl FromStr for ShareScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "year" => Ok(ShareScope::Year),
            "folder" => Ok(ShareScope::Folder),
            _ => Err(format!("Invalid share scope: {}", s)),
        }
    }
}

/// Settings and upload bookkeeping, persisted between runs.
#[derive(Debug, Clone, PartialEq)]
pub struct UploaderConfig {
    /// Basenames of the images known to be uploaded.
    pub latest_uploaded: Vec<String>,
    pub client_secret_file: PathBuf,
    pub application_name: String,
    /// Recipient email addresses.
    pub share_with: Vec<String>,
    /// Groupings already shared with every recipient.
    pub shared_folder: Vec<String>,
    pub search_directory: PathBuf,
    /// Look for images in `search_directory/<year>/<month>/<day>`.
    pub date_directory: bool,
    pub interval_secs: u64,
    pub n_last_images: usize,
    pub share_scope: ShareScope,
}

impl UploaderConfig {
    pub fn new(client_secret_file: PathBuf) -> Self {
        Self {
            latest_uploaded: Vec::new(),
            client_secret_file,
            application_name: "image-upload".to_string(),
            share_with: Vec::new(),
            shared_folder: Vec::new(),
            search_directory: PathBuf::from("timelapse"),
            date_directory: true,
            interval_secs: 30,
            n_last_images: 5,
            share_scope: ShareScope::Year,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn is_uploaded(&self, basename: &str) -> bool {
        self.latest_uploaded.iter().any(|name| name == basename)
    }

    pub fn is_shared(&self, grouping: &str) -> bool {
        self.shared_folder.iter().any(|name| name == grouping)
    }

    pub fn mark_shared(&mut self, grouping: &str) {
        if !self.is_shared(grouping) {
            self.shared_folder.push(grouping.to_string());
        }
    }

    pub fn clear_shared(&mut self, grouping: &str) {
        self.shared_folder.retain(|name| name != grouping);
    }

    pub fn log_summary(&self) {
        tracing::info!("latest_uploaded: {:?}", self.latest_uploaded);
        tracing::info!("shared_folder: {:?}", self.shared_folder);
        tracing::info!("client_secret_file: {}", self.client_secret_file.display());
        tracing::info!("application_name: {}", self.application_name);
        tracing::info!("search_directory: {}", self.search_directory.display());
        tracing::info!("share_with: {:?}", self.share_with);
        tracing::info!("date_directory: {}", self.date_directory);
        tracing::info!("interval: {}", self.interval_secs);
        tracing::info!("n_last_images: {}", self.n_last_images);
        tracing::info!("share_scope: {}", self.share_scope.as_str());
    }
}
