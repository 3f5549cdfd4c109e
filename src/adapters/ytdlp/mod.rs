//! yt-dlp backed extractor.

pub mod cmd;
pub mod download;
pub mod metadata;

use crate::domain::download::DownloadJob;
use crate::domain::metadata::MetadataRecord;
use crate::error::Result;
use crate::ports::{MediaExtractor, ProgressSink};
use async_trait::async_trait;
use cmd::{RealToolRunner, ToolRunner};
use tokio_util::sync::CancellationToken;

pub struct YtDlp<R = RealToolRunner> {
    runner: R,
}

impl YtDlp<RealToolRunner> {
    pub fn new(bin: impl Into<std::path::PathBuf>) -> Self {
        Self::with_runner(RealToolRunner::new(bin))
    }
}

impl<R: ToolRunner> YtDlp<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl<R> MediaExtractor for YtDlp<R>
where
    R: ToolRunner + 'static,
{
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn fetch_metadata(&self, url: &str) -> Result<MetadataRecord> {
        metadata::fetch(&self.runner, url).await
    }

    async fn download(
        &self,
        job: &DownloadJob,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let child = self
            .runner
            .spawn_download(&job.url, &job.format_id, &job.output_path)?;
        tracing::debug!(download = %job.id, pid = ?child.id(), "spawned yt-dlp");
        download::relay(child, sink, cancel).await
    }
}
