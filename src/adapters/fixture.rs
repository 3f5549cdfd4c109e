//! Canned backend: fixed metadata and simulated progress, no subprocess.

use crate::domain::download::DownloadJob;
use crate::domain::metadata::{
    format_duration, FormatRecord, MediaKind, MetadataRecord, PlaylistEntry,
};
use crate::domain::progress::{ProgressEvent, ProgressTracker};
use crate::error::{Error, Result};
use crate::ports::{MediaExtractor, ProgressSink};
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const MIB: f64 = 1024.0 * 1024.0;

/// (format id, width, height, note, approximate size in MiB)
const FORMATS: &[(&str, u32, u32, &str, f64)] = &[
    ("137+140", 1920, 1080, "1080p", 225.0),
    ("136+140", 1280, 720, "720p", 115.0),
    ("135+140", 854, 480, "480p", 60.0),
    ("134+140", 640, 360, "360p", 30.0),
    ("133+140", 426, 240, "240p", 15.0),
    ("160+140", 256, 144, "144p", 7.5),
];

/// (id, title, duration)
const PLAYLIST: &[(&str, &str, &str)] = &[
    ("video1", "Introduction to Web Development", "12:34"),
    ("video2", "HTML Basics - Structure and Semantics", "8:25"),
    ("video3", "CSS Fundamentals - Styling Your First Page", "15:41"),
    ("video4", "JavaScript Essentials for Beginners", "22:15"),
    ("video5", "Responsive Design Principles", "18:07"),
    ("video6", "Building Your First Interactive Website", "28:30"),
];

const STEPS: u32 = 10;

pub fn is_playlist_url(url: &str) -> bool {
    url.contains("playlist") || url.contains("list=")
}

fn formats() -> Vec<FormatRecord> {
    FORMATS
        .iter()
        .map(|(id, width, height, note, size)| FormatRecord {
            format_id: id.to_string(),
            ext: String::from("mp4"),
            resolution: format!("{}x{}", width, height),
            format_note: note.to_string(),
            vcodec: String::from("avc1.4d401f"),
            acodec: String::from("mp4a.40.2"),
            filesize: (size * MIB) as u64,
            fps: Some(30.0),
            tbr: None,
        })
        .collect()
}

fn approximate_size(format_id: &str) -> Option<f64> {
    FORMATS
        .iter()
        .find(|(id, ..)| *id == format_id)
        .map(|(.., size)| *size)
}

/// Serves the same record shapes as the real tool without touching the network.
#[derive(Debug, Clone)]
pub struct Fixture {
    step: Duration,
}

impl Fixture {
    pub fn new(step: Duration) -> Self {
        Self { step }
    }

    pub fn metadata(url: &str) -> MetadataRecord {
        if is_playlist_url(url) {
            let entries: Vec<PlaylistEntry> = PLAYLIST
                .iter()
                .map(|(id, title, duration)| PlaylistEntry {
                    id: id.to_string(),
                    title: title.to_string(),
                    thumbnail: format!("https://picsum.photos/seed/{}/320/180", id),
                    duration: duration.to_string(),
                })
                .collect();
            MetadataRecord {
                id: String::from("fixture-playlist"),
                kind: MediaKind::Playlist,
                title: String::from("Web Development Fundamentals"),
                description: String::new(),
                thumbnail: String::from("https://picsum.photos/seed/playlist/640/360"),
                duration: 0.0,
                duration_string: format_duration(0.0),
                uploader: String::from("Code Academy"),
                webpage_url: url.to_string(),
                formats: formats(),
                entries,
            }
        } else {
            MetadataRecord {
                id: String::from("fixture-video"),
                kind: MediaKind::Video,
                title: String::from("Learn Web Development in 2023"),
                description: String::from("A canned video served by the fixture backend."),
                thumbnail: String::from("https://picsum.photos/seed/thumbnail/640/360"),
                duration: 925.0,
                duration_string: format_duration(925.0),
                uploader: String::from("Code Academy"),
                webpage_url: url.to_string(),
                formats: formats(),
                entries: Vec::new(),
            }
        }
    }
}

#[async_trait]
impl MediaExtractor for Fixture {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn fetch_metadata(&self, url: &str) -> Result<MetadataRecord> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::validation("URL is required"));
        }
        Ok(Self::metadata(url))
    }

    async fn download(
        &self,
        job: &DownloadJob,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let Some(size) = approximate_size(&job.format_id) else {
            sink.emit(ProgressEvent::warning(format!(
                "ERROR: [fixture] Requested format is not available: {}",
                job.format_id
            )));
            return Err(Error::DownloadFailed(Some(1)));
        };

        let mut tracker = ProgressTracker::new();
        sink.emit(tracker.observe(&format!(
            "[info] {}: Downloading 1 format(s): {}",
            job.url, job.format_id
        )));

        for step in 1..=STEPS {
            tokio::select! {
                _ = tokio::time::sleep(self.step) => {}
                _ = cancel.cancelled() => return Err(Error::Cancelled),
            }
            let pct = f64::from(step) * 100.0 / f64::from(STEPS);
            let remaining = (STEPS - step) as u64 * self.step.as_secs().max(1);
            sink.emit(tracker.observe(&format!(
                "[download] {:>5.1}% of ~{:>7.2}MiB at    2.50MiB/s ETA {:02}:{:02}",
                pct,
                size,
                remaining / 60,
                remaining % 60
            )));
        }

        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&job.output_path, b"").await?;
        sink.emit(tracker.observe(&format!(
            "[Merger] Merging formats into \"{}\"",
            job.output_path.display()
        )));
        Ok(())
    }
}
