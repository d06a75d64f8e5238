use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use course_core::model::media::sniff_image_extension;
use course_core::model::{Lesson, LessonId, UploadKind};
use storage::repository::{LessonRepository, StorageError};
use tracing::{info, warn};
use uuid::Uuid;

use super::extractor::FrameExtractor;
use crate::error::{ExtractError, ThumbnailOverrideError};
use crate::media_store::{MediaStore, UPLOADS_DIR};

/// Directory under `uploads/` for generated and overridden lesson thumbnails.
pub const THUMBNAILS_DIR: &str = "thumbnails";

/// Generates, persists and overrides lesson thumbnails.
///
/// Generation never fails the caller: every error is logged and reported as
/// "no thumbnail".
#[derive(Clone)]
pub struct ThumbnailService {
    media: Arc<MediaStore>,
    extractor: Arc<dyn FrameExtractor>,
    lessons: Arc<dyn LessonRepository>,
}

impl ThumbnailService {
    #[must_use]
    pub fn new(
        media: Arc<MediaStore>,
        extractor: Arc<dyn FrameExtractor>,
        lessons: Arc<dyn LessonRepository>,
    ) -> Self {
        Self {
            media,
            extractor,
            lessons,
        }
    }

    /// Extract a frame from the stored video at `video_path`.
    ///
    /// Returns the public path of the new JPEG, or `None` on any failure.
    pub async fn extract_thumbnail(&self, video_path: &str) -> Option<String> {
        match self.try_extract(video_path).await {
            Ok(public_path) => {
                info!(video = video_path, thumbnail = %public_path, "generated thumbnail");
                Some(public_path)
            }
            Err(err) => {
                warn!(video = video_path, error = %err, "thumbnail generation failed");
                None
            }
        }
    }

    async fn try_extract(&self, video_path: &str) -> Result<String, ExtractError> {
        let video = self
            .media
            .resolve(video_path)
            .ok_or_else(|| ExtractError::UnresolvablePath(video_path.to_owned()))?;
        let stem = video
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("video");
        let file_name = format!("{stem}-{}.jpg", Uuid::new_v4().simple());

        let dir = self.media.root().join(UPLOADS_DIR).join(THUMBNAILS_DIR);
        tokio::fs::create_dir_all(&dir).await?;
        let output = dir.join(&file_name);

        if let Err(err) = self.extractor.extract_frame(&video, &output).await {
            remove_if_present(&output).await;
            return Err(err);
        }
        if !tokio::fs::try_exists(&output).await? {
            return Err(ExtractError::MissingOutput(output));
        }
        Ok(format!("/{UPLOADS_DIR}/{THUMBNAILS_DIR}/{file_name}"))
    }

    /// Delete a generated thumbnail that never made it into a lesson row.
    pub async fn discard_thumbnail(&self, public_path: &str) {
        if let Some(path) = self.media.resolve(public_path) {
            remove_if_present(&path).await;
        }
    }

    /// Give `lesson` a generated thumbnail if it only has a placeholder, and persist it.
    ///
    /// Returns `true` when a new thumbnail was stored.
    pub async fn ensure_lesson_thumbnail(&self, lesson: &mut Lesson) -> bool {
        if !lesson.needs_thumbnail() {
            return false;
        }
        let Some(path) = self.extract_thumbnail(lesson.video_path()).await else {
            return false;
        };
        let previous = lesson.thumbnail_path().map(str::to_owned);
        if let Err(err) = lesson.set_thumbnail_path(Some(path.clone())) {
            warn!(lesson = %lesson.id(), error = %err, "generated thumbnail path rejected");
            self.discard_thumbnail(&path).await;
            return false;
        }
        match self.lessons.set_lesson_thumbnail(lesson.id(), Some(&path)).await {
            Ok(()) => true,
            Err(err) => {
                warn!(lesson = %lesson.id(), error = %err, "failed to persist thumbnail");
                self.discard_thumbnail(&path).await;
                // the in-memory copy must not point at the deleted file
                if let Err(err) = lesson.set_thumbnail_path(previous) {
                    warn!(lesson = %lesson.id(), error = %err, "failed to restore thumbnail path");
                }
                false
            }
        }
    }

    /// Regenerate thumbnails for every lesson that lacks a raster one.
    ///
    /// Returns how many lessons received a thumbnail.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lesson list cannot be loaded.
    pub async fn rebuild_missing(&self) -> Result<usize, StorageError> {
        let lessons = self.lessons.list_all_lessons().await?;
        let mut rebuilt = 0;
        for mut lesson in lessons.into_iter().filter(Lesson::needs_thumbnail) {
            if self.ensure_lesson_thumbnail(&mut lesson).await {
                rebuilt += 1;
            }
        }
        info!(rebuilt, "thumbnail rebuild finished");
        Ok(rebuilt)
    }

    /// Replace a lesson's thumbnail with a base64 image (raw or `data:` URL).
    ///
    /// # Errors
    ///
    /// Returns `ThumbnailOverrideError::LessonNotFound` for an unknown lesson,
    /// `InvalidEncoding` for bad base64, `Media` for unsupported or oversized
    /// images, and `Storage`/`Upload` on persistence failures.
    pub async fn store_override(
        &self,
        lesson_id: LessonId,
        payload: &str,
    ) -> Result<Lesson, ThumbnailOverrideError> {
        let mut lesson = self
            .lessons
            .get_lesson(lesson_id)
            .await?
            .ok_or(ThumbnailOverrideError::LessonNotFound(lesson_id))?;

        let encoded = payload
            .trim()
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(',').map(|(_, data)| data))
            .unwrap_or(payload.trim());
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|_| ThumbnailOverrideError::InvalidEncoding)?;
        let extension = sniff_image_extension(&bytes)?;

        let stem = format!("lesson-{lesson_id}-{}", Uuid::new_v4().simple());
        let stored = self
            .media
            .store_bytes(UploadKind::Image, THUMBNAILS_DIR, &stem, extension, &bytes)
            .await?;

        if let Err(err) = lesson.set_thumbnail_path(Some(stored.public_path.clone())) {
            self.media.remove(&stored).await;
            return Err(err.into());
        }
        if let Err(err) = self
            .lessons
            .set_lesson_thumbnail(lesson_id, Some(&stored.public_path))
            .await
        {
            self.media.remove(&stored).await;
            return Err(err.into());
        }
        info!(lesson = %lesson_id, thumbnail = %stored.public_path, "thumbnail overridden");
        Ok(lesson)
    }
}

/// Remove a file that may or may not exist.
async fn remove_if_present(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), error = %err, "failed to remove thumbnail"),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use course_core::model::{Difficulty, MediaValidationError, UploadLimits};
    use course_core::time::fixed_now;
    use storage::repository::{NewCourseRecord, NewLessonRecord, Storage};

    use super::*;

    /// Writes a fake JPEG, or fails, and counts invocations.
    struct StubExtractor {
        succeed: bool,
        calls: AtomicUsize,
    }

    impl StubExtractor {
        fn new(succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                succeed,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl FrameExtractor for StubExtractor {
        async fn extract_frame(&self, _video: &Path, output: &Path) -> Result<(), ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                tokio::fs::write(output, [0xFF, 0xD8, 0xFF, 0xE0]).await?;
                Ok(())
            } else {
                // a crashing decoder can leave a truncated frame behind
                tokio::fs::write(output, [0xFF, 0xD8]).await?;
                Err(ExtractError::Failed {
                    status: "exit status: 1".into(),
                    stderr: "boom".into(),
                })
            }
        }
    }

    async fn setup(
        root: &Path,
        extractor: Arc<StubExtractor>,
        thumbnail: Option<&str>,
    ) -> (ThumbnailService, Storage, Lesson) {
        let storage = Storage::in_memory();
        let course = storage
            .courses
            .insert_new_course(NewCourseRecord {
                title: "Pilates".into(),
                description: None,
                difficulty: Difficulty::Beginner,
                thumbnail_path: None,
                created_at: fixed_now(),
            })
            .await
            .unwrap();
        let lesson = storage
            .lessons
            .append_lesson(NewLessonRecord {
                course_id: course,
                title: "Oddech".into(),
                description: None,
                video_path: "/uploads/videos/oddech.mp4".into(),
                thumbnail_path: thumbnail.map(str::to_owned),
            })
            .await
            .unwrap();
        let media = Arc::new(MediaStore::new(root, UploadLimits::default()));
        let service = ThumbnailService::new(media, extractor, Arc::clone(&storage.lessons));
        (service, storage, lesson)
    }

    #[tokio::test]
    async fn generated_name_uses_video_stem() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _, _) = setup(dir.path(), StubExtractor::new(true), None).await;
        let path = service
            .extract_thumbnail("/uploads/videos/oddech.mp4")
            .await
            .unwrap();
        assert!(path.starts_with("/uploads/thumbnails/oddech-"));
        assert!(path.ends_with(".jpg"));
        assert!(dir.path().join(path.trim_start_matches('/')).exists());
    }

    #[tokio::test]
    async fn failures_become_none() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _, _) = setup(dir.path(), StubExtractor::new(false), None).await;
        assert_eq!(service.extract_thumbnail("/uploads/videos/oddech.mp4").await, None);
        assert_eq!(service.extract_thumbnail("/uploads/../secret.mp4").await, None);
    }

    async fn thumbnail_files(root: &Path) -> usize {
        let dir = root.join(UPLOADS_DIR).join(THUMBNAILS_DIR);
        let mut count = 0;
        if let Ok(mut entries) = tokio::fs::read_dir(&dir).await {
            while entries.next_entry().await.unwrap().is_some() {
                count += 1;
            }
        }
        count
    }

    #[tokio::test]
    async fn failed_extractions_leave_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = StubExtractor::new(false);
        let (service, _, _) = setup(dir.path(), Arc::clone(&extractor), None).await;
        for _ in 0..2 {
            assert_eq!(service.extract_thumbnail("/uploads/videos/oddech.mp4").await, None);
        }
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 2);
        assert_eq!(thumbnail_files(dir.path()).await, 0);
    }

    #[tokio::test]
    async fn unpersisted_thumbnail_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let (service, storage, mut lesson) =
            setup(dir.path(), StubExtractor::new(true), None).await;
        storage.lessons.delete_lesson(lesson.id()).await.unwrap();

        assert!(!service.ensure_lesson_thumbnail(&mut lesson).await);
        assert_eq!(lesson.thumbnail_path(), None);
        assert_eq!(thumbnail_files(dir.path()).await, 0);
    }

    #[tokio::test]
    async fn placeholder_is_replaced_and_raster_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = StubExtractor::new(true);
        let (service, storage, mut lesson) = setup(
            dir.path(),
            Arc::clone(&extractor),
            Some("/img/hero_pilates.svg"),
        )
        .await;

        assert!(service.ensure_lesson_thumbnail(&mut lesson).await);
        let stored = storage.lessons.get_lesson(lesson.id()).await.unwrap().unwrap();
        assert_eq!(stored.thumbnail_path(), lesson.thumbnail_path());
        assert!(!stored.needs_thumbnail());

        assert!(!service.ensure_lesson_thumbnail(&mut lesson).await);
        assert_eq!(service.rebuild_missing().await.unwrap(), 0);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn override_accepts_data_url_png() {
        let dir = tempfile::tempdir().unwrap();
        let (service, storage, lesson) = setup(dir.path(), StubExtractor::new(false), None).await;
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        let payload = format!("data:image/png;base64,{}", STANDARD.encode(png));

        let updated = service.store_override(lesson.id(), &payload).await.unwrap();
        let path = updated.thumbnail_path().unwrap();
        assert!(path.starts_with(&format!("/uploads/thumbnails/lesson-{}-", lesson.id())));
        assert!(path.ends_with(".png"));
        let stored = storage.lessons.get_lesson(lesson.id()).await.unwrap().unwrap();
        assert_eq!(stored.thumbnail_path(), Some(path));
    }

    #[tokio::test]
    async fn override_rejects_bad_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _, lesson) = setup(dir.path(), StubExtractor::new(false), None).await;

        let err = service.store_override(lesson.id(), "%%%").await.unwrap_err();
        assert!(matches!(err, ThumbnailOverrideError::InvalidEncoding));

        let svg = STANDARD.encode("<svg/>");
        let err = service.store_override(lesson.id(), &svg).await.unwrap_err();
        assert!(matches!(
            err,
            ThumbnailOverrideError::Media(MediaValidationError::UnrecognizedImage)
        ));

        let err = service
            .store_override(LessonId::new(404), &svg)
            .await
            .unwrap_err();
        assert!(matches!(err, ThumbnailOverrideError::LessonNotFound(_)));
    }
}
