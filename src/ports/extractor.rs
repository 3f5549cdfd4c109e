use crate::domain::download::DownloadJob;
use crate::domain::metadata::MetadataRecord;
use crate::domain::progress::ProgressEvent;
use crate::error::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Receives the non-terminal events of one download, in order.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// The backend that knows how to inspect and fetch media.
///
/// Implementations only report what the tool says; the terminal event of a
/// download is emitted by the caller from the returned result.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Describe the resource behind `url`.
    async fn fetch_metadata(&self, url: &str) -> Result<MetadataRecord>;

    /// Download `job` to its output path, relaying progress into `sink`
    /// until the work ends or `cancel` fires.
    async fn download(
        &self,
        job: &DownloadJob,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<()>;
}
