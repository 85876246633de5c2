//! Content storage configuration.

use serde::{Deserialize, Serialize};

/// Top-level content storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage provider to use: `"local"` or `"memory"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Sub-directory for uploaded media files.
    #[serde(default = "default_upload_subdir")]
    pub upload_subdir: String,
    /// Sub-directory for preview images.
    #[serde(default = "default_preview_subdir")]
    pub preview_subdir: String,
    /// Maximum upload size in bytes (default 1 GB, 0 disables the check).
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: u64,
    /// Lowercase file extensions that may be uploaded.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Local filesystem storage configuration.
    #[serde(default)]
    pub local: LocalStorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            upload_subdir: default_upload_subdir(),
            preview_subdir: default_preview_subdir(),
            max_upload_size_bytes: default_max_upload(),
            allowed_extensions: default_allowed_extensions(),
            local: LocalStorageConfig::default(),
        }
    }
}

/// Local filesystem storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    /// Root path for local content storage.
    #[serde(default = "default_local_root")]
    pub root_path: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_local_root(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}

fn default_upload_subdir() -> String {
    "upload".to_string()
}

fn default_preview_subdir() -> String {
    "preview".to_string()
}

fn default_max_upload() -> u64 {
    1_000_000_000 // 1 GB
}

fn default_local_root() -> String {
    "./data/media".to_string()
}

fn default_allowed_extensions() -> Vec<String> {
    [
        "aac", "ace", "ai", "aiff", "avi", "bmp", "dir", "doc", "docx", "dmg", "eps", "fla", "flv",
        "gif", "gz", "hqx", "htm", "html", "ico", "indd", "inx", "jpg", "jar", "jpeg", "key", "md",
        "mov", "mp3", "mp4", "mpc", "mkv", "mpg", "mpeg", "numbers", "ogg", "odg", "odf", "odp",
        "ods", "odt", "otf", "pages", "pdf", "png", "pps", "ppsx", "ps", "psd", "rar", "rm", "rst",
        "rtf", "sit", "swf", "tar", "tga", "tif", "tiff", "ttf", "txt", "wav", "wma", "wmv", "xls",
        "xlsx", "xml", "zip",
    ]
    .iter()
    .map(|ext| ext.to_string())
    .collect()
}
