//! Reads and writes the uploader's INI configuration file.
//!
//! Lists are comma separated on disk and plain `Vec<String>` in memory; the
//! conversion only happens in [`parse`] and [`serialize`].

use crate::models::config::{ShareScope, UploaderConfig};
use crate::utils::error::{Result, UploaderError};
use ini::{Ini, Properties};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CONFIG_FILE: &str = "image-upload.config";
pub const CONFIG_PATH_ENV: &str = "IMAGE_UPLOAD_CONFIG";

const SECTION_INFORMATION: &str = "Information";
const SECTION_DRIVE: &str = "Drive";
const SECTION_APPLICATION: &str = "Application";

/// Location of the config file: `$IMAGE_UPLOAD_CONFIG` or the default name in the working directory.
pub fn default_config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<UploaderConfig> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            UploaderError::InvalidConfig(format!("Cannot read {}: {}", self.path.display(), e))
        })?;
        let config = parse(&text)?;

        if !config.search_directory.exists() {
            tracing::warn!(
                "Directory {} does not yet exist...",
                config.search_directory.display()
            );
        }

        Ok(config)
    }

    /// Rewrite the whole file. The new content is written next to it and renamed into place.
    pub fn save(&self, config: &UploaderConfig) -> Result<()> {
        let text = serialize(config)?;

        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        std::fs::write(&temp_path, text)?;
        std::fs::rename(&temp_path, &self.path)?;

        tracing::debug!("Configuration written to {}", self.path.display());
        Ok(())
    }
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Ok(true),
        "0" | "no" | "false" | "off" => Ok(false),
        _ => Err(UploaderError::InvalidConfig(format!(
            "{} must be a boolean, got '{}'",
            key, value
        ))),
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        UploaderError::InvalidConfig(format!("{} must be a positive integer, got '{}'", key, value))
    })
}

fn optional<'a>(section: Option<&'a Properties>, key: &str) -> Option<&'a str> {
    section.and_then(|s| s.get(key))
}

pub fn parse(text: &str) -> Result<UploaderConfig> {
    let ini = Ini::load_from_str(text)?;
    let information = ini.section(Some(SECTION_INFORMATION));
    let drive = ini.section(Some(SECTION_DRIVE));
    let application = ini.section(Some(SECTION_APPLICATION));

    let client_secret_file = optional(drive, "client_secret_file")
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| UploaderError::InvalidConfig("[Drive] client_secret_file is required".to_string()))?;

    let mut config = UploaderConfig::new(PathBuf::from(client_secret_file));

    config.latest_uploaded = split_list(optional(information, "latest_uploaded"));
    config.share_with = split_list(optional(drive, "share_with"));
    config.shared_folder = split_list(optional(drive, "shared_folder"));

    if let Some(name) = optional(drive, "application_name") {
        config.application_name = name.trim().to_string();
    }
    if let Some(dir) = optional(application, "search_directory") {
        config.search_directory = PathBuf::from(dir.trim());
    }
    if let Some(value) = optional(application, "date_directory") {
        config.date_directory = parse_bool("date_directory", value)?;
    }
    if let Some(value) = optional(application, "interval") {
        config.interval_secs = parse_number("interval", value)?;
    }
    if let Some(value) = optional(application, "n_last_images") {
        config.n_last_images = parse_number("n_last_images", value)?;
    }
    if let Some(value) = optional(application, "share_scope") {
        config.share_scope = value.parse().map_err(UploaderError::InvalidConfig)?;
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &UploaderConfig) -> Result<()> {
    if config.interval_secs == 0 {
        return Err(UploaderError::InvalidConfig("interval must be at least 1 second".to_string()));
    }
    if config.n_last_images == 0 {
        return Err(UploaderError::InvalidConfig("n_last_images must be at least 1".to_string()));
    }
    Ok(())
}

pub fn serialize(config: &UploaderConfig) -> Result<String> {
    let mut ini = Ini::new();

    ini.with_section(Some(SECTION_INFORMATION))
        .set("latest_uploaded", config.latest_uploaded.join(","));

    ini.with_section(Some(SECTION_DRIVE))
        .set("client_secret_file", config.client_secret_file.to_string_lossy())
        .set("application_name", config.application_name.as_str())
        .set("share_with", config.share_with.join(","))
        .set("shared_folder", config.shared_folder.join(","));

    ini.with_section(Some(SECTION_APPLICATION))
        .set("search_directory", config.search_directory.to_string_lossy())
        .set("date_directory", config.date_directory.to_string())
        .set("interval", config.interval_secs.to_string())
        .set("n_last_images", config.n_last_images.to_string())
        .set("share_scope", config.share_scope.as_str());

    let mut buffer = Vec::new();
    ini.write_to(&mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| UploaderError::InvalidConfig(format!("Configuration is not valid UTF-8: {}", e)))
}
