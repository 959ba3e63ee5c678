//! Naming rules for uploaded part images.

use mast_core::{DomainError, DomainResult, PartId};
use uuid::Uuid;

/// URL prefix under which stored images are served.
pub const IMAGE_URL_PREFIX: &str = "/static/images";

/// Accepted image formats, keyed by file extension.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Derive the format from an uploaded file name (`photo.JPG` → `Jpeg`).
    pub fn from_file_name(name: &str) -> DomainResult<Self> {
        name.rsplit_once('.')
            .and_then(|(_, ext)| Self::from_extension(ext))
            .ok_or_else(|| {
                DomainError::validation("image must be one of: png, jpg, jpeg, gif, webp")
            })
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }
}

/// File name of a stored image: a single path segment with a known extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImageName {
    name: String,
    format: ImageFormat,
}

impl StoredImageName {
    /// Fresh, collision-free name for a part's upload.
    pub fn generate(part_id: PartId, format: ImageFormat) -> Self {
        Self {
            name: format!("{}_{}.{}", part_id, Uuid::now_v7().simple(), format.extension()),
            format,
        }
    }

    /// Validate a name requested by a client (no directory components).
    pub fn parse(name: &str) -> DomainResult<Self> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
            || name.starts_with('.')
        {
            return Err(DomainError::validation("invalid image name"));
        }
        let format = ImageFormat::from_file_name(name)?;
        Ok(Self {
            name: name.to_string(),
            format,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Public URL persisted on the part.
    pub fn url(&self) -> String {
        format!("{IMAGE_URL_PREFIX}/{}", self.name)
    }
}
