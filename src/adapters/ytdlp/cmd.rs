use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::{Child, Command};

/// Thin wrapper over the two ways we invoke yt-dlp.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run to completion, capturing stdout and stderr whole.
    async fn dump_metadata(&self, url: &str) -> io::Result<Output>;

    /// Start a download with stdout and stderr piped.
    fn spawn_download(&self, url: &str, format_id: &str, output_path: &Path)
        -> io::Result<Child>;
}

pub fn metadata_args(url: &str) -> Vec<OsString> {
    vec![
        OsString::from("--dump-single-json"),
        OsString::from("--flat-playlist"),
        OsString::from(url),
    ]
}

pub fn download_args(url: &str, format_id: &str, output_path: &Path) -> Vec<OsString> {
    vec![
        OsString::from("-f"),
        OsString::from(format_id),
        OsString::from("-o"),
        output_path.as_os_str().to_owned(),
        OsString::from("--newline"),
        OsString::from(url),
    ]
}

pub struct RealToolRunner {
    bin: PathBuf,
}

impl RealToolRunner {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }
}

#[async_trait]
impl ToolRunner for RealToolRunner {
    async fn dump_metadata(&self, url: &str) -> io::Result<Output> {
        Command::new(&self.bin)
            .args(metadata_args(url))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
    }

    fn spawn_download(
        &self,
        url: &str,
        format_id: &str,
        output_path: &Path,
    ) -> io::Result<Child> {
        Command::new(&self.bin)
            .args(download_args(url, format_id, output_path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
    }
}
