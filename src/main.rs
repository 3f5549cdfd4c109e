use axum::Router;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vidpull::adapters::fixture::Fixture;
use vidpull::adapters::http;
use vidpull::adapters::ytdlp::YtDlp;
use vidpull::application::DownloadService;
use vidpull::ports::MediaExtractor;
use vidpull::{AppConfig, Backend};

fn build<E>(extractor: E, config: &AppConfig) -> Router
where
    E: MediaExtractor + 'static,
{
    tracing::info!(backend = extractor.name(), "using extractor");
    let service = Arc::new(DownloadService::new(extractor, config));
    http::router(service, &config.downloads_dir)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    tokio::fs::create_dir_all(&config.downloads_dir).await?;

    let app = match config.backend {
        Backend::YtDlp => build(YtDlp::new(config.ytdlp_bin.clone()), &config),
        Backend::Fixture => build(Fixture::new(config.fixture_step), &config),
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(
        addr = %config.bind_addr(),
        downloads = %config.downloads_dir.display(),
        "listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
