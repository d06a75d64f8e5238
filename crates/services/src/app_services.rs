use std::path::PathBuf;
use std::sync::Arc;

use course_core::model::UploadLimits;
use storage::repository::Storage;

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::error::AppServicesError;
use crate::feed_service::LessonFeedService;
use crate::media_store::{MediaStore, UPLOADS_DIR};
use crate::profile_service::ProfileService;
use crate::progress_service::ProgressService;
use crate::thumbnails::{FrameExtractor, ThumbnailService};

/// Where uploads go and how thumbnails are produced.
#[derive(Clone)]
pub struct MediaSettings {
    pub root: PathBuf,
    pub limits: UploadLimits,
    pub extractor: Arc<dyn FrameExtractor>,
}

/// Assembles the app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    media: Arc<MediaStore>,
    progress: Arc<ProgressService>,
    feed: Arc<LessonFeedService>,
    thumbnails: Arc<ThumbnailService>,
    catalog: Arc<CatalogService>,
    profiles: Arc<ProfileService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated,
    /// or the media root cannot be created.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        media: MediaSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(&storage, clock, media).await
    }

    /// Build services over an existing storage aggregate.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::MediaRoot` if the uploads directory cannot be created.
    pub async fn from_storage(
        storage: &Storage,
        clock: Clock,
        media: MediaSettings,
    ) -> Result<Self, AppServicesError> {
        tokio::fs::create_dir_all(media.root.join(UPLOADS_DIR)).await?;
        let store = Arc::new(MediaStore::new(media.root, media.limits));

        let thumbnails = Arc::new(ThumbnailService::new(
            Arc::clone(&store),
            media.extractor,
            Arc::clone(&storage.lessons),
        ));
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.lessons),
            Arc::clone(&storage.enrollments),
            Arc::clone(&storage.progress),
        ));
        let feed = Arc::new(LessonFeedService::new(
            Arc::clone(&storage.courses),
            Arc::clone(&storage.lessons),
            Arc::clone(&storage.enrollments),
            Arc::clone(&storage.progress),
            Arc::clone(&thumbnails),
        ));
        let catalog = Arc::new(CatalogService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.lessons),
            Arc::clone(&store),
            Arc::clone(&thumbnails),
        ));
        let profiles = Arc::new(ProfileService::new(
            Arc::clone(&storage.profiles),
            Arc::clone(&storage.courses),
            Arc::clone(&storage.enrollments),
            Arc::clone(&storage.progress),
        ));

        Ok(Self {
            media: store,
            progress,
            feed,
            thumbnails,
            catalog,
            profiles,
        })
    }

    #[must_use]
    pub fn media(&self) -> Arc<MediaStore> {
        Arc::clone(&self.media)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn feed(&self) -> Arc<LessonFeedService> {
        Arc::clone(&self.feed)
    }

    #[must_use]
    pub fn thumbnails(&self) -> Arc<ThumbnailService> {
        Arc::clone(&self.thumbnails)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn profiles(&self) -> Arc<ProfileService> {
        Arc::clone(&self.profiles)
    }
}
