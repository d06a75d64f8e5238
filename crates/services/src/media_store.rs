//! Upload storage under the media root.
//!
//! Files land in `<root>/uploads/<kind dir>/<uuid><ext>` and are addressed by
//! their public path (`/uploads/<kind dir>/<uuid><ext>`).

use std::path::{Component, Path, PathBuf};

use course_core::model::media::validated_extension;
use course_core::model::{MediaValidationError, UploadKind, UploadLimits};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::UploadError;

pub const UPLOADS_DIR: &str = "uploads";

/// A file that has been fully written and validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub kind: UploadKind,
    pub public_path: String,
    pub disk_path: PathBuf,
    pub size: u64,
}

/// Writes uploads into the media root, enforcing per-kind size ceilings.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    limits: UploadLimits,
}

impl MediaStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, limits: UploadLimits) -> Self {
        Self {
            root: root.into(),
            limits,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn limits(&self) -> UploadLimits {
        self.limits
    }

    /// Map a public `/uploads/...` path (or a bare relative one) to a file under the root.
    ///
    /// Returns `None` for empty paths and anything that would escape the root.
    #[must_use]
    pub fn resolve(&self, public_path: &str) -> Option<PathBuf> {
        resolve_under(&self.root, public_path)
    }

    /// Validate the file name and open a new upload file.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Media` for a disallowed extension and
    /// `UploadError::Io` if the file cannot be created.
    pub async fn begin(
        &self,
        kind: UploadKind,
        file_name: &str,
    ) -> Result<PendingUpload, UploadError> {
        let extension = validated_extension(kind, file_name)?;
        let stem = Uuid::new_v4().to_string();
        let (disk_path, public_path) = self.allocate(kind.directory(), &stem, &extension).await?;
        let file = tokio::fs::File::create(&disk_path).await?;
        Ok(PendingUpload {
            kind,
            file,
            disk_path,
            public_path,
            written: 0,
            max_bytes: self.limits.max_bytes(kind),
        })
    }

    /// Store an in-memory payload in `dir` as `<stem><extension>`.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Media` if the payload is empty or larger than the
    /// ceiling for `kind`, `UploadError::Io` on write failures.
    pub async fn store_bytes(
        &self,
        kind: UploadKind,
        dir: &str,
        stem: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<StoredUpload, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::empty(kind));
        }
        let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        let max_bytes = self.limits.max_bytes(kind);
        if size > max_bytes {
            return Err(MediaValidationError::TooLarge { kind, max_bytes }.into());
        }
        let (disk_path, public_path) = self.allocate(dir, stem, extension).await?;
        tokio::fs::write(&disk_path, bytes).await?;
        Ok(StoredUpload {
            kind,
            public_path,
            disk_path,
            size,
        })
    }

    /// Best-effort removal of a stored file.
    pub async fn remove(&self, upload: &StoredUpload) {
        if let Err(err) = tokio::fs::remove_file(&upload.disk_path).await {
            tracing::warn!(path = %upload.disk_path.display(), error = %err, "failed to remove upload");
        }
    }

    async fn allocate(
        &self,
        dir: &str,
        stem: &str,
        extension: &str,
    ) -> Result<(PathBuf, String), std::io::Error> {
        let dir_path = self.root.join(UPLOADS_DIR).join(dir);
        tokio::fs::create_dir_all(&dir_path).await?;
        let file_name = format!("{stem}{extension}");
        Ok((
            dir_path.join(&file_name),
            format!("/{UPLOADS_DIR}/{dir}/{file_name}"),
        ))
    }
}

pub(crate) fn resolve_under(root: &Path, public_path: &str) -> Option<PathBuf> {
    let relative = Path::new(public_path.trim().trim_start_matches('/'));
    let mut resolved = root.to_path_buf();
    let mut any = false;
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                any = true;
            }
            Component::CurDir => {}
            _ => return None,
        }
    }
    any.then_some(resolved)
}

/// An upload being streamed to disk chunk by chunk.
#[derive(Debug)]
pub struct PendingUpload {
    kind: UploadKind,
    file: tokio::fs::File,
    disk_path: PathBuf,
    public_path: String,
    written: u64,
    max_bytes: u64,
}

impl PendingUpload {
    #[must_use]
    pub fn kind(&self) -> UploadKind {
        self.kind
    }

    /// Append a chunk.
    ///
    /// # Errors
    ///
    /// Returns `MediaValidationError::TooLarge` once the running total passes the
    /// ceiling; the caller should then `abort`.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), UploadError> {
        let len = u64::try_from(chunk.len()).unwrap_or(u64::MAX);
        let total = self.written.saturating_add(len);
        if total > self.max_bytes {
            return Err(MediaValidationError::TooLarge {
                kind: self.kind,
                max_bytes: self.max_bytes,
            }
            .into());
        }
        self.file.write_all(chunk).await?;
        self.written = total;
        Ok(())
    }

    /// Flush and close the file.
    ///
    /// # Errors
    ///
    /// An empty upload is rejected as missing and its file removed.
    pub async fn finish(mut self) -> Result<StoredUpload, UploadError> {
        if self.written == 0 {
            let kind = self.kind;
            self.abort().await;
            return Err(UploadError::empty(kind));
        }
        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(StoredUpload {
            kind: self.kind,
            public_path: self.public_path,
            disk_path: self.disk_path,
            size: self.written,
        })
    }

    /// Drop the partial file.
    pub async fn abort(self) {
        let PendingUpload {
            file, disk_path, ..
        } = self;
        drop(file);
        if let Err(err) = tokio::fs::remove_file(&disk_path).await {
            tracing::warn!(path = %disk_path.display(), error = %err, "failed to remove partial upload");
        }
    }
}
