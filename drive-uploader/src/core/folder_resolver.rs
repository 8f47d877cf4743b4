use crate::providers::traits::{RemoteStorage, SearchQuery};
use crate::utils::error::Result;

/// A remote folder chain, one entry per path segment, root first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub segments: Vec<ResolvedFolder>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFolder {
    pub name: String,
    pub id: String,
}

impl ResolvedPath {
    /// Id of the deepest folder, the upload target.
    pub fn target_id(&self) -> Option<&str> {
        self.segments.last().map(|folder| folder.id.as_str())
    }

    /// Id of the folder containing segment `index`, `None` for the top level.
    pub fn parent_of(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|parent| self.segments.get(parent))
            .map(|folder| folder.id.as_str())
    }
}

/// Find the folder `name` under `parent_id`, creating it when missing.
///
/// When the listing holds several folders with that name the first one is used.
/// Listings are ordered by creation time, so this is the oldest duplicate.
pub async fn resolve_or_create_folder(
    storage: &dyn RemoteStorage,
    name: &str,
    parent_id: Option<&str>,
) -> Result<String> {
    let query = SearchQuery::folders().named(name).in_parent(parent_id);
    let matches = storage.find(&query).await?;

    if matches.len() > 1 {
        tracing::warn!(
            "Multiple folders named '{}' found ({}). Using the first!",
            name,
            matches.len()
        );
    }

    if let Some(existing) = matches.into_iter().next() {
        tracing::debug!("Using folder '{}' (ID: {})", name, existing.id);
        return Ok(existing.id);
    }

    storage.create_folder(name, parent_id).await
}

/// Resolve every segment in turn, each one nested in the previous.
pub async fn resolve_path(storage: &dyn RemoteStorage, segments: &[String]) -> Result<ResolvedPath> {
    let mut resolved = Vec::with_capacity(segments.len());
    let mut parent_id: Option<String> = None;

    for segment in segments {
        let id = resolve_or_create_folder(storage, segment, parent_id.as_deref()).await?;
        resolved.push(ResolvedFolder {
            name: segment.clone(),
            id: id.clone(),
        });
        parent_id = Some(id);
    }

    Ok(ResolvedPath { segments: resolved })
}
