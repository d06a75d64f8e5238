use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use course_core::model::UploadLimits;

const MIB: u64 = 1024 * 1024;

/// Deployment mode; only `Development` exposes the `/dev` routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => f.write_str("development"),
            Environment::Production => f.write_str("production"),
        }
    }
}

#[derive(Debug)]
pub enum ArgsError {
    HelpRequested,
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidValue { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::HelpRequested => f.write_str("help requested"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidValue { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_url: String,
    pub bind: SocketAddr,
    pub media_root: PathBuf,
    pub environment: Environment,
    pub ffmpeg: String,
    pub thumbnail_timeout: Duration,
    pub limits: UploadLimits,
}

impl AppConfig {
    /// Environment variables first, then flags on top.
    ///
    /// `env` is a lookup so tests need not touch the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ArgsError` for unknown flags or unparsable values, and
    /// `ArgsError::HelpRequested` for `-h`/`--help`.
    pub fn parse(
        env: impl Fn(&str) -> Option<String>,
        args: impl IntoIterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut raw = RawConfig {
            db: env("COURSE_DB_URL").unwrap_or_else(|| "sqlite:dev.sqlite3".into()),
            bind: env("COURSE_BIND").unwrap_or_else(|| "127.0.0.1:8080".into()),
            media_root: env("COURSE_MEDIA_ROOT").unwrap_or_else(|| "./media".into()),
            environment: env("COURSE_ENV").unwrap_or_else(|| "production".into()),
            ffmpeg: env("COURSE_FFMPEG").unwrap_or_else(|| "ffmpeg".into()),
            thumbnail_timeout_secs: env("COURSE_THUMBNAIL_TIMEOUT_SECS")
                .unwrap_or_else(|| "20".into()),
            max_video_mb: env("COURSE_MAX_VIDEO_MB").unwrap_or_else(|| "2048".into()),
            max_image_mb: env("COURSE_MAX_IMAGE_MB").unwrap_or_else(|| "5".into()),
        };

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let (flag, slot) = match arg.as_str() {
                "--db" => ("--db", &mut raw.db),
                "--bind" => ("--bind", &mut raw.bind),
                "--media-root" => ("--media-root", &mut raw.media_root),
                "--env" => ("--env", &mut raw.environment),
                "--ffmpeg" => ("--ffmpeg", &mut raw.ffmpeg),
                "--thumbnail-timeout-secs" => {
                    ("--thumbnail-timeout-secs", &mut raw.thumbnail_timeout_secs)
                }
                "--max-video-mb" => ("--max-video-mb", &mut raw.max_video_mb),
                "--max-image-mb" => ("--max-image-mb", &mut raw.max_image_mb),
                "--help" | "-h" => return Err(ArgsError::HelpRequested),
                _ => return Err(ArgsError::UnknownArg(arg)),
            };
            *slot = args.next().ok_or(ArgsError::MissingValue { flag })?;
        }

        raw.finish()
    }

    /// Largest request body the router accepts: one video plus form overhead.
    #[must_use]
    pub fn body_limit(&self) -> usize {
        usize::try_from(self.limits.max_video_bytes.saturating_add(MIB)).unwrap_or(usize::MAX)
    }
}

struct RawConfig {
    db: String,
    bind: String,
    media_root: String,
    environment: String,
    ffmpeg: String,
    thumbnail_timeout_secs: String,
    max_video_mb: String,
    max_image_mb: String,
}

impl RawConfig {
    fn finish(self) -> Result<AppConfig, ArgsError> {
        if self.db.trim().is_empty() {
            return Err(invalid("--db", self.db));
        }
        let bind = self
            .bind
            .parse()
            .map_err(|_| invalid("--bind", self.bind.clone()))?;
        if self.media_root.trim().is_empty() {
            return Err(invalid("--media-root", self.media_root));
        }
        let environment = Environment::parse(&self.environment)
            .ok_or_else(|| invalid("--env", self.environment.clone()))?;
        if self.ffmpeg.trim().is_empty() {
            return Err(invalid("--ffmpeg", self.ffmpeg));
        }
        let timeout_secs = positive("--thumbnail-timeout-secs", &self.thumbnail_timeout_secs)?;
        let max_video_mb = positive("--max-video-mb", &self.max_video_mb)?;
        let max_image_mb = positive("--max-image-mb", &self.max_image_mb)?;

        Ok(AppConfig {
            db_url: normalize_sqlite_url(self.db),
            bind,
            media_root: PathBuf::from(self.media_root),
            environment,
            ffmpeg: self.ffmpeg,
            thumbnail_timeout: Duration::from_secs(timeout_secs),
            limits: UploadLimits {
                max_video_bytes: max_video_mb.saturating_mul(MIB),
                max_image_bytes: max_image_mb.saturating_mul(MIB),
            },
        })
    }
}

fn invalid(flag: &'static str, raw: String) -> ArgsError {
    ArgsError::InvalidValue { flag, raw }
}

fn positive(flag: &'static str, raw: &str) -> Result<u64, ArgsError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| invalid(flag, raw.to_owned()))
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>                 default: sqlite:dev.sqlite3");
    eprintln!("  --bind <addr>                     default: 127.0.0.1:8080");
    eprintln!("  --media-root <dir>                default: ./media");
    eprintln!("  --env <development|production>    default: production");
    eprintln!("  --ffmpeg <binary>                 default: ffmpeg");
    eprintln!("  --thumbnail-timeout-secs <n>      default: 20");
    eprintln!("  --max-video-mb <n>                default: 2048");
    eprintln!("  --max-image-mb <n>                default: 5");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  COURSE_DB_URL, COURSE_BIND, COURSE_MEDIA_ROOT, COURSE_ENV, COURSE_FFMPEG,");
    eprintln!("  COURSE_THUMBNAIL_TIMEOUT_SECS, COURSE_MAX_VIDEO_MB, COURSE_MAX_IMAGE_MB");
}

fn is_in_memory(db_url: &str) -> bool {
    db_url == "sqlite::memory:" || db_url.contains("mode=memory")
}

/// Turn `sqlite:foo.db` or a bare path into an absolute `sqlite://` URL.
pub fn normalize_sqlite_url(raw: String) -> String {
    if is_in_memory(&raw) || raw.starts_with("sqlite://") || raw.starts_with("sqlite:file:") {
        return raw;
    }

    let trimmed = raw.trim();
    let path = Path::new(trimmed.strip_prefix("sqlite:").unwrap_or(trimmed));
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file and its parent directory so the pool can open it.
///
/// # Errors
///
/// Returns `ArgsError::InvalidValue` for a URL without a path and any I/O
/// error from creating the file.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if is_in_memory(db_url) || db_url.starts_with("sqlite:file:") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| invalid("--db", db_url.to_string()))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(invalid("--db", db_url.to_string()).into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}
