//! Best-effort lesson thumbnails: frame extraction from stored videos and
//! client-supplied overrides.

mod extractor;
mod service;

pub use extractor::{FfmpegFrameExtractor, FrameExtractor, DEFAULT_EXTRACT_TIMEOUT};
pub use service::{THUMBNAILS_DIR, ThumbnailService};
