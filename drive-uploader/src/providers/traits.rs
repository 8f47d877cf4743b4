use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
pub const JPEG_MIME: &str = "image/jpeg";

/// An object returned by a remote listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub id: String,
    pub name: String,
}

/// Filter for [`RemoteStorage::find`]: MIME equality plus optional name and parent clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub mime_type: String,
    pub name: Option<String>,
    pub parent_id: Option<String>,
}

impl SearchQuery {
    pub fn mime(mime_type: &str) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            name: None,
            parent_id: None,
        }
    }

    pub fn folders() -> Self {
        Self::mime(FOLDER_MIME)
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn in_parent(mut self, parent_id: Option<&str>) -> Self {
        self.parent_id = parent_id.map(str::to_string);
        self
    }

    /// Whether `object` satisfies the name clause. MIME and parent are left to the service.
    pub fn matches_name(&self, object: &RemoteObject) -> bool {
        self.name.as_deref().map_or(true, |name| name == object.name)
    }
}

/// Operations the uploader needs from a remote object store.
///
/// Implementations never retry; callers decide how to react to an `Err`.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// Get the name of this provider
    fn name(&self) -> &str;

    /// Create a folder and return its id. No uniqueness check is made.
    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<String>;

    /// Upload a local JPEG into `parent_id` (or the root) and return the new id.
    async fn upload_file(&self, source: &Path, parent_id: Option<&str>) -> Result<String>;

    /// Give `email` write access to the object, without a notification email.
    async fn grant_access(&self, object_id: &str, email: &str) -> Result<()>;

    /// Permanently delete an object.
    async fn delete_object(&self, object_id: &str) -> Result<()>;

    /// List every object matching `query`, following pagination to the end.
    async fn find(&self, query: &SearchQuery) -> Result<Vec<RemoteObject>>;
}
