//! Error types shared by the fetcher, the supervisor and the HTTP adapter.

use std::fmt;
use std::io;
use std::time::Duration;

/// Message used when the tool fails without writing anything to stderr.
pub const DEFAULT_EXTRACTION_MESSAGE: &str = "Failed to fetch video info";

#[derive(Debug)]
pub enum Error {
    /// Missing or invalid input, rejected before any subprocess is spawned.
    Validation(String),
    /// The tool exited non-zero while dumping metadata.
    ExtractionFailed(String),
    /// The tool exited zero but its stdout was not a metadata document.
    MalformedMetadata(serde_json::Error),
    TimedOut(Duration),
    /// The tool could not be started or its pipes failed.
    Spawn(io::Error),
    /// The tool exited non-zero while downloading.
    DownloadFailed(Option<i32>),
    /// Every listener went away and the child was killed.
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Build an `ExtractionFailed` from raw stderr bytes, falling back to the
    /// default message when the tool said nothing.
    pub fn extraction_failed(stderr: &[u8]) -> Self {
        let text = String::from_utf8_lossy(stderr).trim().to_string();
        if text.is_empty() {
            Error::ExtractionFailed(DEFAULT_EXTRACTION_MESSAGE.to_string())
        } else {
            Error::ExtractionFailed(text)
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(msg) => write!(f, "{}", msg),
            Error::ExtractionFailed(msg) => write!(f, "{}", msg),
            Error::MalformedMetadata(_) => write!(f, "Failed to parse video info"),
            Error::TimedOut(after) => {
                write!(f, "Media tool timed out after {}s", after.as_secs())
            }
            Error::Spawn(e) => write!(f, "Failed to run media tool: {}", e),
            Error::DownloadFailed(Some(code)) => {
                write!(f, "Download failed with exit code {}", code)
            }
            Error::DownloadFailed(None) => write!(f, "Download failed"),
            Error::Cancelled => write!(f, "Download cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MalformedMetadata(e) => Some(e),
            Error::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Spawn(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedMetadata(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_failed_keeps_stderr() {
        let err = Error::extraction_failed(b"ERROR: video unavailable\n");
        match err {
            Error::ExtractionFailed(msg) => assert_eq!(msg, "ERROR: video unavailable"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_extraction_failed_default_message() {
        let err = Error::extraction_failed(b"  \n");
        assert_eq!(err.to_string(), DEFAULT_EXTRACTION_MESSAGE);
    }

    #[test]
    fn test_malformed_metadata_hides_parser_details() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = Error::from(parse_err);
        assert_eq!(err.to_string(), "Failed to parse video info");
        assert!(std::error::Error::source(&err).is_some());
    }
}
