use std::path::Path;

use thiserror::Error;

/// Extensions treated as vector icons rather than real thumbnails.
const PLACEHOLDER_EXTENSIONS: &[&str] = &["svg"];

//
// ─── ERRORS (domain validation) ────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MediaValidationError {
    #[error("a {0} file is required")]
    Missing(UploadKind),

    #[error("unsupported {kind} file type: {extension}")]
    UnsupportedExtension { kind: UploadKind, extension: String },

    #[error("{kind} file is too large (max {max_bytes} bytes)")]
    TooLarge { kind: UploadKind, max_bytes: u64 },

    #[error("image data is not a supported raster format")]
    UnrecognizedImage,
}

impl MediaValidationError {
    /// Form field the error belongs to.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            MediaValidationError::Missing(kind)
            | MediaValidationError::UnsupportedExtension { kind, .. }
            | MediaValidationError::TooLarge { kind, .. } => kind.field(),
            MediaValidationError::UnrecognizedImage => UploadKind::Image.field(),
        }
    }
}

//
// ─── UPLOAD KINDS ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadKind {
    Video,
    Image,
}

impl UploadKind {
    /// Lower-case extensions (with leading dot) accepted for this kind.
    #[must_use]
    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            UploadKind::Video => &[".mp4", ".mov", ".webm", ".mkv"],
            UploadKind::Image => &[".jpg", ".jpeg", ".png", ".webp"],
        }
    }

    /// Directory under `uploads/` where files of this kind are stored.
    #[must_use]
    pub fn directory(self) -> &'static str {
        match self {
            UploadKind::Video => "videos",
            UploadKind::Image => "thumbs",
        }
    }

    #[must_use]
    pub fn field(self) -> &'static str {
        match self {
            UploadKind::Video => "video",
            UploadKind::Image => "thumbnail",
        }
    }
}

impl std::fmt::Display for UploadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadKind::Video => f.write_str("video"),
            UploadKind::Image => f.write_str("image"),
        }
    }
}

/// Upload size ceilings in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_video_bytes: u64,
    pub max_image_bytes: u64,
}

impl UploadLimits {
    #[must_use]
    pub fn max_bytes(&self, kind: UploadKind) -> u64 {
        match kind {
            UploadKind::Video => self.max_video_bytes,
            UploadKind::Image => self.max_image_bytes,
        }
    }
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_video_bytes: 2 * 1024 * 1024 * 1024,
            max_image_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Returns the lower-cased extension (with dot) of `file_name` if it is allowed for `kind`.
///
/// # Errors
///
/// Returns `MediaValidationError::UnsupportedExtension` otherwise.
pub fn validated_extension(
    kind: UploadKind,
    file_name: &str,
) -> Result<String, MediaValidationError> {
    let extension = Path::new(file_name.trim())
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    if kind.allowed_extensions().contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(MediaValidationError::UnsupportedExtension { kind, extension })
    }
}

/// True when a thumbnail path is unset, blank, or a vector placeholder icon.
///
/// Raster thumbnails are never considered missing once present.
#[must_use]
pub fn is_placeholder_thumbnail(path: Option<&str>) -> bool {
    let Some(path) = path.map(str::trim).filter(|p| !p.is_empty()) else {
        return true;
    };
    let lower = path.to_ascii_lowercase();
    PLACEHOLDER_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{ext}")))
}

/// Sniff raster image bytes and return the matching file extension.
///
/// # Errors
///
/// Returns `MediaValidationError::UnrecognizedImage` for anything other than JPEG, PNG or WebP.
pub fn sniff_image_extension(bytes: &[u8]) -> Result<&'static str, MediaValidationError> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Ok(".jpg");
    }
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Ok(".png");
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Ok(".webp");
    }
    Err(MediaValidationError::UnrecognizedImage)
}
