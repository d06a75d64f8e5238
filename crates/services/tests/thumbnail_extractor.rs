#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use course_core::model::UploadLimits;
use services::{ExtractError, FfmpegFrameExtractor, FrameExtractor, MediaStore, ThumbnailService};
use storage::repository::Storage;

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

// One test so the scripts are written and executed strictly in sequence.
#[tokio::test]
async fn subprocess_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("clip.mp4");
    std::fs::write(&video, b"video").unwrap();

    let ok = script(dir.path(), "ok.sh", r#"for last; do :; done; printf jpg > "$last""#);
    let slow = script(dir.path(), "slow.sh", "sleep 5");
    let failing = script(dir.path(), "fail.sh", "echo boom >&2; exit 3");
    let silent = script(dir.path(), "silent.sh", "exit 0");
    // 128 KiB on each stream, well past a pipe buffer
    let noisy = script(
        dir.path(),
        "noisy.sh",
        r#"head -c 131072 /dev/zero; head -c 131072 /dev/zero >&2; for last; do :; done; printf jpg > "$last""#,
    );
    let truncated = script(
        dir.path(),
        "truncated.sh",
        r#"for last; do :; done; printf jp > "$last"; exit 1"#,
    );

    let out = dir.path().join("ok.jpg");
    FfmpegFrameExtractor::new(&ok, Duration::from_secs(5))
        .extract_frame(&video, &out)
        .await
        .unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), b"jpg");

    let out = dir.path().join("noisy.jpg");
    FfmpegFrameExtractor::new(&noisy, Duration::from_secs(5))
        .extract_frame(&video, &out)
        .await
        .unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), b"jpg");

    let err = FfmpegFrameExtractor::new(&slow, Duration::from_millis(200))
        .extract_frame(&video, &dir.path().join("slow.jpg"))
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::TimedOut(_)));

    let err = FfmpegFrameExtractor::new(&failing, Duration::from_secs(5))
        .extract_frame(&video, &dir.path().join("fail.jpg"))
        .await
        .unwrap_err();
    match err {
        ExtractError::Failed { stderr, .. } => assert_eq!(stderr, "boom"),
        other => panic!("unexpected error: {other}"),
    }

    let err = FfmpegFrameExtractor::new(&silent, Duration::from_secs(5))
        .extract_frame(&video, &dir.path().join("silent.jpg"))
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::MissingOutput(_)));

    // the service turns every failure into "no thumbnail"
    let media_root = tempfile::tempdir().unwrap();
    let storage = Storage::in_memory();
    let media = Arc::new(MediaStore::new(media_root.path(), UploadLimits::default()));
    for (binary, timeout) in [
        (&slow, Duration::from_millis(200)),
        (&failing, Duration::from_secs(5)),
        (&truncated, Duration::from_secs(5)),
    ] {
        let service = ThumbnailService::new(
            Arc::clone(&media),
            Arc::new(FfmpegFrameExtractor::new(binary, timeout)),
            Arc::clone(&storage.lessons),
        );
        assert_eq!(service.extract_thumbnail("/uploads/videos/clip.mp4").await, None);
    }
    let generated = media_root.path().join("uploads").join("thumbnails");
    assert_eq!(std::fs::read_dir(&generated).unwrap().count(), 0);
}
