use super::hub::{DownloadChannel, DownloadHub, Subscription};
use crate::config::AppConfig;
use crate::domain::download::{DownloadJob, DownloadRequest};
use crate::domain::metadata::MetadataRecord;
use crate::domain::progress::{ProgressEvent, QUEUED_STATUS};
use crate::error::{Error, Result};
use crate::ports::MediaExtractor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use uuid::Uuid;

/// Front door for metadata lookups and supervised downloads.
pub struct DownloadService<E> {
    extractor: E,
    hub: DownloadHub,
    permits: Arc<Semaphore>,
    downloads_dir: PathBuf,
    metadata_timeout: Duration,
    retention: Duration,
}

/// Publishes a failure if the supervising task ends without a terminal event.
struct TerminalGuard(Arc<DownloadChannel>);

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if !self.0.is_finished() {
            self.0.publish(ProgressEvent::failed());
        }
    }
}

impl<E> DownloadService<E>
where
    E: MediaExtractor + 'static,
{
    pub fn new(extractor: E, config: &AppConfig) -> Self {
        Self {
            extractor,
            hub: DownloadHub::new(config.disconnect_grace),
            permits: Arc::new(Semaphore::new(config.max_concurrent_processes.max(1))),
            downloads_dir: config.downloads_dir.clone(),
            metadata_timeout: config.metadata_timeout,
            retention: config.finished_retention,
        }
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub fn hub(&self) -> &DownloadHub {
        &self.hub
    }

    pub async fn fetch_metadata(&self, url: &str) -> Result<MetadataRecord> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::validation("URL is required"));
        }

        let fetch = async {
            let _permit = self.permits.acquire().await.map_err(|_| Error::Cancelled)?;
            self.extractor.fetch_metadata(url).await
        };

        match tokio::time::timeout(self.metadata_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(url, "metadata fetch timed out");
                Err(Error::TimedOut(self.metadata_timeout))
            }
        }
    }

    /// Validate `request`, start supervising it and return the first observer.
    pub fn start_download(self: &Arc<Self>, request: &DownloadRequest) -> Result<Subscription> {
        let job = DownloadJob::new(request, &self.downloads_dir)?;
        let channel = self.hub.open(job.id);
        let subscription = channel.subscribe();

        tracing::info!(
            download = %job.id,
            url = %job.url,
            format = %job.format_id,
            output = %job.output_path.display(),
            backend = self.extractor.name(),
            "starting download"
        );

        let service = self.clone();
        tokio::spawn(async move {
            service.supervise(job, channel).await;
        });

        Ok(subscription)
    }

    pub fn subscribe(&self, id: &Uuid) -> Option<Subscription> {
        self.hub.get(id).map(|channel| channel.subscribe())
    }

    async fn supervise(&self, job: DownloadJob, channel: Arc<DownloadChannel>) {
        let guard = TerminalGuard(channel.clone());
        let cancel = channel.cancel_token().clone();

        let terminal = match self.admit(&channel).await {
            Some(_permit) => match self.extractor.download(&job, channel.as_ref(), &cancel).await {
                Ok(()) => {
                    tracing::info!(download = %job.id, "download complete");
                    ProgressEvent::complete(job.public_path())
                }
                Err(e) => {
                    tracing::warn!(download = %job.id, error = %e, "download failed");
                    ProgressEvent::failed()
                }
            },
            None => {
                tracing::info!(download = %job.id, "download abandoned while queued");
                ProgressEvent::failed()
            }
        };

        channel.publish(terminal);
        drop(guard);

        tokio::time::sleep(self.retention).await;
        self.hub.remove(&job.id);
        if self.hub.is_empty() {
            tracing::debug!("no downloads in flight");
        } else {
            tracing::debug!(active = self.hub.len(), "download retired");
        }
    }

    /// Wait for a process slot. `None` if the download was cancelled first.
    async fn admit(&self, channel: &DownloadChannel) -> Option<OwnedSemaphorePermit> {
        if let Ok(permit) = self.permits.clone().try_acquire_owned() {
            return Some(permit);
        }

        channel.publish(ProgressEvent::status(0.0, QUEUED_STATUS));
        tokio::select! {
            permit = self.permits.clone().acquire_owned() => permit.ok(),
            _ = channel.cancel_token().cancelled() => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::progress::{COMPLETE_STATUS, FAILED_ERROR};
    use crate::ports::ProgressSink;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    /// Emits fixed lines, then succeeds or fails.
    struct Scripted {
        lines: Vec<String>,
        succeed: bool,
        calls: AtomicUsize,
        hold: Option<Duration>,
    }

    impl Scripted {
        fn new(lines: Vec<&str>, succeed: bool) -> Self {
            Self {
                lines: lines.into_iter().map(String::from).collect(),
                succeed,
                calls: AtomicUsize::new(0),
                hold: None,
            }
        }
    }

    #[async_trait]
    impl MediaExtractor for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn fetch_metadata(&self, _url: &str) -> Result<MetadataRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(hold) = self.hold {
                tokio::time::sleep(hold).await;
            }
            Ok(MetadataRecord::from_json(r#"{"title": "scripted"}"#)?)
        }

        async fn download(
            &self,
            _job: &DownloadJob,
            sink: &dyn ProgressSink,
            cancel: &CancellationToken,
        ) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut tracker = crate::domain::progress::ProgressTracker::new();
            for line in &self.lines {
                sink.emit(tracker.observe(line));
            }
            if let Some(hold) = self.hold {
                tokio::select! {
                    _ = tokio::time::sleep(hold) => {}
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                }
            }
            if self.succeed {
                Ok(())
            } else {
                Err(Error::DownloadFailed(Some(1)))
            }
        }
    }

    fn config() -> AppConfig {
        AppConfig {
            downloads_dir: PathBuf::from("/tmp/vidpull-test"),
            finished_retention: Duration::from_millis(10),
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn test_success_ends_with_one_terminal_event() {
        let lines = vec!["[download]  10.0%", "[download]  55.5%", "[download] 100.0%"];
        let service = Arc::new(DownloadService::new(Scripted::new(lines, true), &config()));
        let request = DownloadRequest::new("https://youtu.be/test", "160+140").with_title("");

        let events: Vec<ProgressEvent> = service
            .start_download(&request)
            .unwrap()
            .into_stream()
            .collect()
            .await;

        assert_eq!(events.len(), 4);
        let progress: Vec<f64> = events[..3].iter().filter_map(|e| e.progress).collect();
        assert_eq!(progress, vec![10.0, 55.5, 100.0]);
        assert!(events[..3].iter().all(|e| !e.is_terminal()));

        let last = &events[3];
        assert!(last.is_terminal());
        assert_eq!(last.status.as_deref(), Some(COMPLETE_STATUS));
        assert_eq!(last.output_path.as_deref(), Some("/downloads/video_160+140.mp4"));
    }

    #[tokio::test]
    async fn test_fast_tool_output_is_not_dropped() {
        let mut extractor = Scripted::new(vec![], true);
        extractor.lines = (0..300)
            .map(|n| format!("[download] {}.0% of 10.00MiB", n / 3))
            .collect();
        let service = Arc::new(DownloadService::new(extractor, &config()));
        let request = DownloadRequest::new("https://youtu.be/test", "18");

        let events: Vec<ProgressEvent> = service
            .start_download(&request)
            .unwrap()
            .into_stream()
            .collect()
            .await;

        assert_eq!(events.len(), 301);
        assert!(events[..300].iter().all(|e| !e.is_terminal()));
        assert_eq!(events[299].progress, Some(99.0));
        assert!(events[300].is_terminal());
    }

    #[tokio::test]
    async fn test_failure_ends_with_failed_event() {
        let service = Arc::new(DownloadService::new(
            Scripted::new(vec!["[download]   5.0%"], false),
            &config(),
        ));
        let request = DownloadRequest::new("https://youtu.be/test", "18");

        let events: Vec<ProgressEvent> = service
            .start_download(&request)
            .unwrap()
            .into_stream()
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[1].error.as_deref(), Some(FAILED_ERROR));
        assert!(events[1].is_terminal());
    }

    #[tokio::test]
    async fn test_invalid_download_never_reaches_backend() {
        let service = Arc::new(DownloadService::new(Scripted::new(vec![], true), &config()));
        let result = service.start_download(&DownloadRequest::new("", "18"));
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(service.extractor().calls.load(Ordering::SeqCst), 0);
        assert!(service.hub().is_empty());
    }

    #[tokio::test]
    async fn test_empty_metadata_url_never_reaches_backend() {
        let service = DownloadService::new(Scripted::new(vec![], true), &config());
        let result = service.fetch_metadata("   ").await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(service.extractor().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_metadata_timeout() {
        let mut extractor = Scripted::new(vec![], true);
        extractor.hold = Some(Duration::from_secs(5));
        let config = AppConfig {
            metadata_timeout: Duration::from_millis(20),
            ..config()
        };
        let service = DownloadService::new(extractor, &config);

        let result = service.fetch_metadata("https://youtu.be/test").await;
        assert!(matches!(result, Err(Error::TimedOut(_))));
    }

    #[tokio::test]
    async fn test_second_download_waits_for_a_slot() {
        let mut extractor = Scripted::new(vec![], true);
        extractor.hold = Some(Duration::from_millis(100));
        let config = AppConfig {
            max_concurrent_processes: 1,
            ..config()
        };
        let service = Arc::new(DownloadService::new(extractor, &config));

        let first = service
            .start_download(&DownloadRequest::new("https://youtu.be/a", "18"))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = service
            .start_download(&DownloadRequest::new("https://youtu.be/b", "18"))
            .unwrap();

        let second_events: Vec<ProgressEvent> = second.into_stream().collect().await;
        assert_eq!(second_events[0].status.as_deref(), Some(QUEUED_STATUS));
        assert!(second_events.last().unwrap().output_path.is_some());

        let first_events: Vec<ProgressEvent> = first.into_stream().collect().await;
        assert!(first_events.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn test_disconnect_cancels_download() {
        let mut extractor = Scripted::new(vec![], true);
        extractor.hold = Some(Duration::from_secs(30));
        let config = AppConfig {
            disconnect_grace: Duration::ZERO,
            finished_retention: Duration::from_secs(30),
            ..config()
        };
        let service = Arc::new(DownloadService::new(extractor, &config));

        let subscription = service
            .start_download(&DownloadRequest::new("https://youtu.be/a", "18"))
            .unwrap();
        let id = subscription.download_id();
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(subscription);

        let mut late = service.subscribe(&id).expect("download is still registered");
        let terminal = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match late.next_event().await {
                    Some(event) if event.is_terminal() => return event,
                    Some(_) => continue,
                    None => panic!("stream ended without a terminal event"),
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(terminal.error.as_deref(), Some(FAILED_ERROR));
    }
}
