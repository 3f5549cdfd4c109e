//! Download requests and the file names derived from them.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Public URL prefix under which finished downloads are served.
pub const DOWNLOADS_PREFIX: &str = "/downloads";

pub const FALLBACK_TITLE: &str = "video";
pub const MAX_TITLE_CHARS: usize = 30;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub format_id: String,
    #[serde(default)]
    pub video_title: Option<String>,
    /// Container extension of the output file. Defaults to `mp4`.
    #[serde(default)]
    pub ext: Option<String>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, format_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format_id: format_id.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.video_title = Some(title.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() || self.format_id.trim().is_empty() {
            return Err(Error::validation("URL and format ID are required"));
        }
        if let Some(ext) = &self.ext {
            if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(Error::validation("Invalid container extension"));
            }
        }
        Ok(())
    }

    pub fn extension(&self) -> &str {
        self.ext.as_deref().unwrap_or("mp4")
    }
}

/// A validated request bound to a concrete output location.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub id: Uuid,
    pub url: String,
    pub format_id: String,
    pub file_name: String,
    pub output_path: PathBuf,
}

impl DownloadJob {
    pub fn new(request: &DownloadRequest, downloads_dir: &Path) -> Result<Self> {
        request.validate()?;
        let file_name = output_file_name(
            request.video_title.as_deref().unwrap_or(""),
            request.format_id.trim(),
            request.extension(),
        );
        Ok(Self {
            id: Uuid::new_v4(),
            url: request.url.trim().to_string(),
            format_id: request.format_id.trim().to_string(),
            output_path: downloads_dir.join(&file_name),
            file_name,
        })
    }

    /// Path clients use to fetch the finished file.
    pub fn public_path(&self) -> String {
        format!("{}/{}", DOWNLOADS_PREFIX, self.file_name)
    }
}

/// Make a title safe for use in a file name.
///
/// Punctuation becomes `_`, whitespace is dropped, and the result is cut to
/// 30 characters. An empty result becomes `video`.
pub fn sanitize_title(title: &str) -> String {
    let sanitized: String = title
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_TITLE_CHARS)
        .collect();

    if sanitized.is_empty() {
        String::from(FALLBACK_TITLE)
    } else {
        sanitized
    }
}

/// `<sanitized-title>_<format-id>.<ext>`
pub fn output_file_name(title: &str, format_id: &str, ext: &str) -> String {
    let format_part: String = format_id
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{}_{}.{}", sanitize_title(title), format_part, ext)
}
