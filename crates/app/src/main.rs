mod auth;
mod config;
mod error;
mod routes;
mod upload;

use std::sync::Arc;

use services::{AppServices, Clock, FfmpegFrameExtractor, MediaSettings};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, ArgsError, prepare_sqlite_file, print_usage};
use crate::routes::{AppState, router};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("app=info,services=info,storage=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = match AppConfig::parse(|key| std::env::var(key).ok(), std::env::args().skip(1)) {
        Ok(config) => config,
        Err(ArgsError::HelpRequested) => {
            print_usage();
            return Ok(());
        }
        Err(e) => {
            eprintln!("{e}");
            print_usage();
            return Err(e.into());
        }
    };

    // Open + migrate SQLite before the listener comes up.
    prepare_sqlite_file(&config.db_url)?;
    let extractor = FfmpegFrameExtractor::new(&config.ffmpeg, config.thumbnail_timeout);
    let services = AppServices::new_sqlite(
        &config.db_url,
        Clock::system(),
        MediaSettings {
            root: config.media_root.clone(),
            limits: config.limits,
            extractor: Arc::new(extractor),
        },
    )
    .await?;

    let app = router(
        AppState {
            services,
            environment: config.environment,
        },
        config.body_limit(),
    );

    let listener = TcpListener::bind(config.bind).await?;
    info!(
        addr = %config.bind,
        env = %config.environment,
        db = %config.db_url,
        media_root = %config.media_root.display(),
        "listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(e) = run().await {
        eprintln!("{e}");
        std::process::exit(2);
    }
}
