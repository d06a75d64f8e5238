//! Multipart forms with at most one streamed file part.

use std::collections::HashMap;

use axum::extract::Multipart;
use axum::extract::multipart::Field;

use course_core::model::UploadKind;
use services::{MediaStore, StoredUpload};

use crate::error::ApiError;

/// Text fields plus the stored file, if one was sent.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    pub file: Option<StoredUpload>,
}

impl UploadForm {
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// A text field, with blank values treated as absent.
    #[must_use]
    pub fn optional_text(&self, name: &str) -> Option<String> {
        self.text(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    }
}

/// Read every part; the part named after `kind` is streamed into `media`.
///
/// An empty file part (no file chosen) counts as no file. On any error the
/// partially or fully written file is removed.
///
/// # Errors
///
/// Returns `ApiError::Validation` for malformed multipart bodies, disallowed
/// extensions and oversized files.
pub async fn read_form(
    media: &MediaStore,
    kind: UploadKind,
    mut multipart: Multipart,
) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    let result = read_parts(media, kind, &mut multipart, &mut form).await;
    if let Err(err) = result {
        if let Some(stored) = form.file.take() {
            media.remove(&stored).await;
        }
        return Err(err);
    }
    Ok(form)
}

async fn read_parts(
    media: &MediaStore,
    kind: UploadKind,
    multipart: &mut Multipart,
    form: &mut UploadForm,
) -> Result<(), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::multipart("form", &e))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        if name == kind.field() {
            let file_name = field.file_name().unwrap_or_default().to_owned();
            if file_name.trim().is_empty() || form.file.is_some() {
                continue;
            }
            form.file = stream_file(media, kind, &file_name, field).await?;
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::multipart("form", &e))?;
            form.fields.insert(name, value);
        }
    }
    Ok(())
}

async fn stream_file(
    media: &MediaStore,
    kind: UploadKind,
    file_name: &str,
    mut field: Field<'_>,
) -> Result<Option<StoredUpload>, ApiError> {
    let mut pending = media.begin(kind, file_name).await?;
    loop {
        match field.chunk().await {
            Ok(Some(chunk)) => {
                if let Err(err) = pending.write_chunk(&chunk).await {
                    pending.abort().await;
                    return Err(err.into());
                }
            }
            Ok(None) => break,
            Err(err) => {
                pending.abort().await;
                return Err(ApiError::multipart(kind.field(), &err));
            }
        }
    }
    Ok(Some(pending.finish().await?))
}
