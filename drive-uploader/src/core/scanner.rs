use crate::models::image::LocalImage;
use crate::utils::error::Result;
use chrono::{Datelike, NaiveDate};
use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Date segments as they appear on disk and remotely: `2024`, `6`, `15` (no zero padding).
pub fn date_segments(date: NaiveDate) -> Vec<String> {
    vec![
        date.year().to_string(),
        date.month().to_string(),
        date.day().to_string(),
    ]
}

/// `root/<year>/<month>/<day>` for `date`, or `None` when it does not exist yet.
pub fn date_directory(root: &Path, date: NaiveDate) -> Option<PathBuf> {
    let path = date_segments(date)
        .iter()
        .fold(root.to_path_buf(), |path, segment| path.join(segment));

    if path.is_dir() {
        Some(path)
    } else {
        tracing::warn!("Directory {} does not yet exist...", path.display());
        None
    }
}

/// The `limit` newest `.jpg` files directly inside `directory`, newest first.
pub async fn latest_images(directory: &Path, limit: usize) -> Result<Vec<LocalImage>> {
    let mut images = Vec::new();

    let mut entries = fs::read_dir(directory).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let is_jpeg = name.to_str().map_or(false, LocalImage::is_jpeg_name);
        if !is_jpeg {
            continue;
        }

        // Follows symlinks, unlike DirEntry::metadata
        let metadata = match fs::metadata(entry.path()).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", entry.path().display(), e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }
        let created = match metadata.created().or_else(|_| metadata.modified()) {
            Ok(created) => created,
            Err(e) => {
                tracing::warn!("Skipping {}, no timestamp available: {}", entry.path().display(), e);
                continue;
            }
        };

        if let Some(image) = LocalImage::new(entry.path(), created) {
            images.push(image);
        }
    }

    // Newest first; equal timestamps fall back to the name so the order is stable
    images.sort_by_key(|image| Reverse((image.created, image.name.clone())));
    images.truncate(limit);

    if images.is_empty() {
        tracing::info!("No images found in directory {}", directory.display());
    }

    Ok(images)
}
