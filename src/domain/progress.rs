use regex::Regex;
use serde::{Deserialize, Serialize};

pub const COMPLETE_STATUS: &str = "Download complete";
pub const FAILED_ERROR: &str = "Download failed";
pub const QUEUED_STATUS: &str = "Waiting for a free download slot";

/// One incremental update pushed to download observers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    terminal: bool,
}

impl ProgressEvent {
    pub fn status(progress: f64, status: impl Into<String>) -> Self {
        Self {
            progress: Some(progress),
            status: Some(status.into()),
            ..Default::default()
        }
    }

    /// A line the tool wrote to stderr. Not fatal.
    pub fn warning(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn complete(output_path: impl Into<String>) -> Self {
        Self {
            progress: Some(100.0),
            status: Some(String::from(COMPLETE_STATUS)),
            output_path: Some(output_path.into()),
            error: None,
            terminal: true,
        }
    }

    pub fn failed() -> Self {
        Self {
            error: Some(String::from(FAILED_ERROR)),
            terminal: true,
            ..Default::default()
        }
    }

    /// Terminal events close the stream; nothing follows them.
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }
}

/// Scrapes `<digits>.<digits>%` out of tool output and remembers the last value.
///
/// Lines without a percentage re-emit the previous value; out of order values
/// are passed through as-is.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    re: Regex,
    current: f64,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            re: Regex::new(r"(\d+\.\d+)%").expect("progress pattern is valid"),
            current: 0.0,
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn parse_percentage(&self, line: &str) -> Option<f64> {
        self.re
            .captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    }

    /// Turn one stdout line into the event observers should see.
    pub fn observe(&mut self, line: &str) -> ProgressEvent {
        if let Some(pct) = self.parse_percentage(line) {
            self.current = pct;
        }
        ProgressEvent::status(self.current, line.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_updates_progress() {
        let mut tracker = ProgressTracker::new();
        let event = tracker.observe("[download]  42.5% of ~ 10.00MiB at 1.00MiB/s ETA 00:05\n");
        assert_eq!(event.progress, Some(42.5));
        assert_eq!(
            event.status.as_deref(),
            Some("[download]  42.5% of ~ 10.00MiB at 1.00MiB/s ETA 00:05")
        );
        assert_eq!(tracker.current(), 42.5);
    }

    #[test]
    fn test_observe_without_percentage_repeats_previous() {
        let mut tracker = ProgressTracker::new();
        tracker.observe("[download]  10.0% of 5MiB");
        let event = tracker.observe("[Merger] Merging formats into \"out.mp4\"");
        assert_eq!(event.progress, Some(10.0));
        assert_eq!(
            event.status.as_deref(),
            Some("[Merger] Merging formats into \"out.mp4\"")
        );
    }

    #[test]
    fn test_integer_percentage_is_not_matched() {
        let tracker = ProgressTracker::new();
        assert_eq!(tracker.parse_percentage("[download] 100% of 5MiB"), None);
        assert_eq!(tracker.parse_percentage("[download] 100.0% of 5MiB"), Some(100.0));
    }

    #[test]
    fn test_out_of_order_values_pass_through() {
        let mut tracker = ProgressTracker::new();
        tracker.observe("[download]  80.0%");
        let event = tracker.observe("[download]   3.1%");
        assert_eq!(event.progress, Some(3.1));
    }

    #[test]
    fn test_terminal_events() {
        assert!(ProgressEvent::complete("/downloads/a.mp4").is_terminal());
        assert!(ProgressEvent::failed().is_terminal());
        assert!(!ProgressEvent::warning("WARNING: slow").is_terminal());
        assert!(!ProgressEvent::warning(FAILED_ERROR).is_terminal());
        assert!(!ProgressEvent::status(12.0, "line").is_terminal());
    }

    #[test]
    fn test_wire_shape() {
        let value = serde_json::to_value(ProgressEvent::complete("/downloads/a.mp4")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "progress": 100.0,
                "status": "Download complete",
                "outputPath": "/downloads/a.mp4"
            })
        );

        let value = serde_json::to_value(ProgressEvent::failed()).unwrap();
        assert_eq!(value, serde_json::json!({ "error": "Download failed" }));
    }
}
