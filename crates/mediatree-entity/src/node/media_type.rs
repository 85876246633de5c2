//! Broad media classification and MIME guessing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The broad category of a node's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    /// A folder.
    Folder,
    /// A compressed archive.
    Archive,
    /// Audio content.
    Audio,
    /// An office or PDF document.
    Document,
    /// An image the probe could not decode.
    Image,
    /// An image with known dimensions.
    SupportedImage,
    /// Plain text.
    Text,
    /// Video content.
    Video,
    /// Anything else.
    File,
}

impl MediaType {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::Archive => "archive",
            Self::Audio => "audio",
            Self::Document => "document",
            Self::Image => "image",
            Self::SupportedImage => "web image",
            Self::Text => "text",
            Self::Video => "video",
            Self::File => "other",
        }
    }

    /// Media types whose content describes itself; a name is enough
    /// metadata for them.
    pub fn is_metadata_less(&self) -> bool {
        matches!(
            self,
            Self::Folder | Self::Document | Self::Archive | Self::Text
        )
    }

    /// Classify a MIME type, first by the full type then by its supertype.
    pub fn from_mime(mime: &str) -> Self {
        match mime {
            "application/octet-stream" => return Self::File,
            "application/zip"
            | "application/x-rar-compressed"
            | "application/x-tar"
            | "application/x-ace-compressed"
            | "application/gzip" => return Self::Archive,
            _ => {}
        }
        match mime.split('/').next().unwrap_or_default() {
            "application" => Self::Document,
            "audio" => Self::Audio,
            "image" => Self::Image,
            "text" => Self::Text,
            "video" => Self::Video,
            _ => Self::File,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fallback MIME type for unknown extensions.
pub const UNKNOWN_MIME: &str = "application/x-unknown";

/// Guess a MIME type from a lowercase extension (without the dot).
pub fn mime_from_extension(ext: &str) -> &'static str {
    match ext {
        "txt" | "md" | "rst" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "xml" => "application/xml",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "rtf" => "application/rtf",
        "ps" | "eps" | "ai" => "application/postscript",
        "zip" => "application/zip",
        "rar" => "application/x-rar-compressed",
        "ace" => "application/x-ace-compressed",
        "gz" | "gzip" => "application/gzip",
        "tar" => "application/x-tar",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        "tga" => "image/x-tga",
        "psd" => "image/vnd.adobe.photoshop",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "mpg" | "mpeg" => "video/mpeg",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "aac" => "audio/aac",
        "aiff" => "audio/aiff",
        "ogg" => "audio/ogg",
        "wma" => "audio/x-ms-wma",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "odt" => "application/vnd.oasis.opendocument.text",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "odp" => "application/vnd.oasis.opendocument.presentation",
        "swf" => "application/x-shockwave-flash",
        "jar" => "application/java-archive",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        _ => UNKNOWN_MIME,
    }
}
