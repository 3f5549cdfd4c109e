//! Configuration loaded from the environment (and `.env`).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which `MediaExtractor` serves requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Shell out to yt-dlp.
    YtDlp,
    /// Canned metadata and simulated progress.
    Fixture,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ytdlp" | "yt-dlp" => Ok(Backend::YtDlp),
            "fixture" | "mock" => Ok(Backend::Fixture),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Where finished downloads land; served under `/downloads`
    pub downloads_dir: PathBuf,
    /// Path or name of the yt-dlp binary
    pub ytdlp_bin: PathBuf,
    pub backend: Backend,
    /// Upper bound on concurrently running tool processes
    pub max_concurrent_processes: usize,
    pub metadata_timeout: Duration,
    /// How long a download survives with no observer attached
    pub disconnect_grace: Duration,
    /// How long a finished download stays attachable
    pub finished_retention: Duration,
    /// Delay between simulated progress lines of the fixture backend
    pub fixture_step: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            addr: String::from("127.0.0.1"),
            port: String::from("3001"),
            downloads_dir: PathBuf::from("./downloads"),
            ytdlp_bin: PathBuf::from("yt-dlp"),
            backend: Backend::YtDlp,
            max_concurrent_processes: 4,
            metadata_timeout: Duration::from_secs(60),
            disconnect_grace: Duration::from_secs(5),
            finished_retention: Duration::from_secs(60),
            fixture_step: Duration::from_millis(200),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Unset or unparsable values keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let secs = |key: &str, default: Duration| {
            parsed(key).map(Duration::from_secs).unwrap_or(default)
        };

        let backend = match lookup("BACKEND") {
            Some(value) => value.parse::<Backend>().unwrap_or_else(|e: String| {
                tracing::warn!("{}, using yt-dlp", e);
                Backend::YtDlp
            }),
            None => defaults.backend,
        };

        Self {
            addr: lookup("ADDR").unwrap_or(defaults.addr),
            port: lookup("PORT").unwrap_or(defaults.port),
            downloads_dir: lookup("DOWNLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.downloads_dir),
            ytdlp_bin: lookup("YTDLP_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.ytdlp_bin),
            backend,
            max_concurrent_processes: parsed("MAX_CONCURRENT_PROCESSES")
                .map(|n| n as usize)
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_processes),
            metadata_timeout: secs("METADATA_TIMEOUT_SECS", defaults.metadata_timeout),
            disconnect_grace: secs("DISCONNECT_GRACE_SECS", defaults.disconnect_grace),
            finished_retention: secs("FINISHED_RETENTION_SECS", defaults.finished_retention),
            fixture_step: parsed("FIXTURE_STEP_MILLIS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.fixture_step),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}
