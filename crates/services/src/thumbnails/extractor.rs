use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::ExtractError;

/// Wall-clock limit for a single extraction.
pub const DEFAULT_EXTRACT_TIMEOUT: Duration = Duration::from_secs(20);

/// Seek position of the captured frame.
const FRAME_AT: &str = "00:00:01";

/// Grabs one still frame from a video into a JPEG file.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Write a single frame of `video` to `output`.
    ///
    /// # Errors
    ///
    /// Returns `ExtractError` if the frame could not be produced.
    async fn extract_frame(&self, video: &Path, output: &Path) -> Result<(), ExtractError>;
}

/// Shells out to an `ffmpeg`-compatible binary.
#[derive(Debug, Clone)]
pub struct FfmpegFrameExtractor {
    binary: OsString,
    timeout: Duration,
}

impl FfmpegFrameExtractor {
    #[must_use]
    pub fn new(binary: impl Into<OsString>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for FfmpegFrameExtractor {
    fn default() -> Self {
        Self::new("ffmpeg", DEFAULT_EXTRACT_TIMEOUT)
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract_frame(&self, video: &Path, output: &Path) -> Result<(), ExtractError> {
        let child = Command::new(&self.binary)
            .args(["-y", "-loglevel", "error", "-ss", FRAME_AT, "-i"])
            .arg(video)
            .args(["-frames:v", "1", "-q:v", "2"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ExtractError::Spawn)?;

        // wait_with_output drains both pipes while waiting; dropping it on timeout kills the child.
        let finished = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ExtractError::TimedOut(self.timeout))??;

        let stderr = String::from_utf8_lossy(&finished.stderr).trim().to_string();
        if !stderr.is_empty() {
            tracing::debug!(video = %video.display(), %stderr, "frame extractor stderr");
        }
        if !finished.status.success() {
            return Err(ExtractError::Failed {
                status: finished.status.to_string(),
                stderr,
            });
        }

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(ExtractError::MissingOutput(output.to_path_buf())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = FfmpegFrameExtractor::new(
            dir.path().join("no-such-ffmpeg"),
            Duration::from_secs(1),
        );
        let err = extractor
            .extract_frame(&dir.path().join("a.mp4"), &dir.path().join("a.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Spawn(_)));
    }

    #[test]
    fn default_uses_twenty_second_budget() {
        assert_eq!(FfmpegFrameExtractor::default().timeout(), Duration::from_secs(20));
    }
}
