//! Metadata records as reported by the media tool.
//!
//! The tool's JSON is read into loose `Raw*` shapes where every field is
//! optional, then normalised into the public records with fixed fallbacks.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_EXT: &str = "mp4";
pub const DEFAULT_RESOLUTION: &str = "unknown";
pub const NO_CODEC: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Playlist,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatRecord {
    pub format_id: String,
    pub ext: String,
    pub resolution: String,
    pub format_note: String,
    pub vcodec: String,
    pub acodec: String,
    /// Exact size when known, otherwise the tool's approximation, otherwise 0.
    pub filesize: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tbr: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub id: String,
    pub title: String,
    pub thumbnail: String,
    pub duration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    /// Seconds.
    pub duration: f64,
    pub duration_string: String,
    pub uploader: String,
    pub webpage_url: String,
    pub formats: Vec<FormatRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<PlaylistEntry>,
}

impl MetadataRecord {
    /// Parse one JSON document written by the tool.
    pub fn from_json(document: &str) -> serde_json::Result<Self> {
        let raw: RawMetadata = serde_json::from_str(document)?;
        Ok(raw.into())
    }
}

/// Render seconds as `m:ss` or `h:mm:ss`.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawThumbnail {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawFormat {
    format_id: Option<String>,
    ext: Option<String>,
    resolution: Option<String>,
    format_note: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
    fps: Option<f64>,
    tbr: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawEntry {
    id: Option<String>,
    title: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    thumbnails: Vec<RawThumbnail>,
    duration: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    id: Option<String>,
    #[serde(rename = "_type")]
    kind: Option<String>,
    title: Option<String>,
    description: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    thumbnails: Vec<RawThumbnail>,
    duration: Option<f64>,
    duration_string: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    webpage_url: Option<String>,
    #[serde(default)]
    formats: Vec<RawFormat>,
    #[serde(default)]
    entries: Vec<RawEntry>,
}

fn last_thumbnail(thumbnails: &[RawThumbnail]) -> Option<String> {
    thumbnails.iter().rev().find_map(|t| t.url.clone())
}

impl From<RawFormat> for FormatRecord {
    fn from(raw: RawFormat) -> Self {
        FormatRecord {
            format_id: raw.format_id.unwrap_or_default(),
            ext: raw.ext.unwrap_or_else(|| String::from(DEFAULT_EXT)),
            resolution: raw
                .resolution
                .unwrap_or_else(|| String::from(DEFAULT_RESOLUTION)),
            format_note: raw.format_note.unwrap_or_default(),
            vcodec: raw.vcodec.unwrap_or_else(|| String::from(NO_CODEC)),
            acodec: raw.acodec.unwrap_or_else(|| String::from(NO_CODEC)),
            filesize: raw
                .filesize
                .or(raw.filesize_approx)
                .filter(|size| size.is_finite() && *size > 0.0)
                .map(|size| size as u64)
                .unwrap_or(0),
            fps: raw.fps,
            tbr: raw.tbr,
        }
    }
}

impl From<RawEntry> for PlaylistEntry {
    fn from(raw: RawEntry) -> Self {
        let thumbnail = raw
            .thumbnail
            .or_else(|| last_thumbnail(&raw.thumbnails))
            .unwrap_or_default();
        PlaylistEntry {
            id: raw.id.unwrap_or_default(),
            title: raw.title.unwrap_or_else(|| String::from(DEFAULT_TITLE)),
            thumbnail,
            duration: format_duration(raw.duration.unwrap_or(0.0)),
        }
    }
}

impl From<RawMetadata> for MetadataRecord {
    fn from(raw: RawMetadata) -> Self {
        let kind = match raw.kind.as_deref() {
            Some("playlist") => MediaKind::Playlist,
            _ => MediaKind::Video,
        };
        let duration = raw.duration.unwrap_or(0.0);
        let thumbnail = raw
            .thumbnail
            .or_else(|| last_thumbnail(&raw.thumbnails))
            .unwrap_or_default();

        MetadataRecord {
            id: raw.id.unwrap_or_default(),
            kind,
            title: raw.title.unwrap_or_else(|| String::from(DEFAULT_TITLE)),
            description: raw.description.unwrap_or_default(),
            thumbnail,
            duration,
            duration_string: raw
                .duration_string
                .unwrap_or_else(|| format_duration(duration)),
            uploader: raw.uploader.or(raw.channel).unwrap_or_default(),
            webpage_url: raw.webpage_url.unwrap_or_default(),
            formats: raw.formats.into_iter().map(FormatRecord::from).collect(),
            entries: raw.entries.into_iter().map(PlaylistEntry::from).collect(),
        }
    }
}
