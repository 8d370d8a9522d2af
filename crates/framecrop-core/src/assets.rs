//! Asset records referenced by image shapes.
//!
//! Assets are owned by the editor; the core only reads their source, MIME type
//! and dimensions to decide how a shape is drawn.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for assets.
pub type AssetId = Uuid;

/// Raster format of asset bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    /// PNG format.
    Png,
    /// JPEG format.
    Jpeg,
    /// WebP format.
    WebP,
    /// GIF format (possibly animated).
    Gif,
}

impl ImageFormat {
    /// Get MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Gif => "image/gif",
        }
    }

    /// Detect format from a MIME type, ignoring parameters such as `; charset=`.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/webp" => Some(ImageFormat::WebP),
            "image/gif" => Some(ImageFormat::Gif),
            _ => None,
        }
    }

    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "webp" => Some(ImageFormat::WebP),
            "gif" => Some(ImageFormat::Gif),
            _ => None,
        }
    }

    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }

        // GIF: GIF87a / GIF89a
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(ImageFormat::Gif);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }

        None
    }
}

/// A still or animated image asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub id: AssetId,
    /// Source url or data url. `None` while an upload is still pending.
    pub src: Option<String>,
    pub mime_type: Option<String>,
    #[serde(default)]
    pub is_animated: bool,
    pub natural_width: Option<u32>,
    pub natural_height: Option<u32>,
}

/// A video asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAsset {
    pub id: AssetId,
    pub src: Option<String>,
    pub mime_type: Option<String>,
    pub natural_width: Option<u32>,
    pub natural_height: Option<u32>,
}

/// A link preview. Never drawable through the image path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkAsset {
    pub id: AssetId,
    pub src: Option<String>,
    #[serde(default)]
    pub title: String,
}

/// Discriminant of [`Asset`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Image,
    Video,
    Bookmark,
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AssetKind::Image => "image",
            AssetKind::Video => "video",
            AssetKind::Bookmark => "bookmark",
        };
        f.write_str(name)
    }
}

/// An asset record as resolved by the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Asset {
    Image(ImageAsset),
    Video(VideoAsset),
    Bookmark(BookmarkAsset),
}

impl Asset {
    pub fn id(&self) -> AssetId {
        match self {
            Asset::Image(a) => a.id,
            Asset::Video(a) => a.id,
            Asset::Bookmark(a) => a.id,
        }
    }

    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Image(_) => AssetKind::Image,
            Asset::Video(_) => AssetKind::Video,
            Asset::Bookmark(_) => AssetKind::Bookmark,
        }
    }

    /// The source url, treating an empty string as absent.
    pub fn src(&self) -> Option<&str> {
        let src = match self {
            Asset::Image(a) => a.src.as_deref(),
            Asset::Video(a) => a.src.as_deref(),
            Asset::Bookmark(a) => a.src.as_deref(),
        };
        src.filter(|s| !s.is_empty())
    }

    pub fn mime_type(&self) -> Option<&str> {
        match self {
            Asset::Image(a) => a.mime_type.as_deref(),
            Asset::Video(a) => a.mime_type.as_deref(),
            Asset::Bookmark(_) => None,
        }
    }

    /// Whether the asset is animated (only images carry this flag).
    pub fn is_animated(&self) -> bool {
        matches!(self, Asset::Image(a) if a.is_animated)
    }

    /// Natural pixel size, when the editor recorded it.
    pub fn natural_size(&self) -> Option<(u32, u32)> {
        match self {
            Asset::Image(a) => a.natural_width.zip(a.natural_height),
            Asset::Video(a) => a.natural_width.zip(a.natural_height),
            Asset::Bookmark(_) => None,
        }
    }

    /// Whether the asset moves on its own and so is subject to reduced motion.
    pub fn is_motion_capable(&self) -> bool {
        match self {
            Asset::Video(_) => true,
            Asset::Image(a) => {
                a.is_animated
                    || a.mime_type.as_deref().is_some_and(|m| m.contains("gif"))
            }
            Asset::Bookmark(_) => false,
        }
    }

    /// Whether the asset is a GIF with a source.
    ///
    /// Only these can have playback toggled and get a captured static frame.
    pub fn is_playable_gif(&self) -> bool {
        self.src().is_some() && self.mime_type() == Some("image/gif")
    }
}
