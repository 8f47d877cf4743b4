use std::path::PathBuf;
use std::time::SystemTime;

/// A JPEG found in the scan directory. Identity is the basename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImage {
    pub path: PathBuf,
    pub name: String,
    /// Creation time, or modification time where the filesystem lacks one.
    pub created: SystemTime,
}

impl LocalImage {
    pub fn new(path: PathBuf, created: SystemTime) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();
        Some(Self { path, name, created })
    }

    pub fn is_jpeg_name(name: &str) -> bool {
        name.to_ascii_lowercase().ends_with(".jpg")
    }
}
