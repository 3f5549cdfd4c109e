use crate::domain::progress::{ProgressEvent, ProgressTracker};
use crate::error::{Error, Result};
use crate::ports::ProgressSink;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio_util::sync::CancellationToken;

fn decode(segment: Vec<u8>) -> String {
    let line = String::from_utf8_lossy(&segment);
    line.trim_end_matches(&['\r', '\n'][..]).to_string()
}

fn lines<R: AsyncRead + Unpin>(reader: R) -> tokio::io::Split<BufReader<R>> {
    BufReader::new(reader).split(b'\n')
}

async fn kill(child: &mut Child) -> Result<()> {
    // `kill` also waits, so the child is reaped here.
    if let Err(e) = child.kill().await {
        if e.kind() != io::ErrorKind::InvalidInput {
            return Err(Error::Spawn(e));
        }
    }
    Ok(())
}

/// Relay a running download's output into `sink` until it exits.
///
/// Stdout lines go through the progress tracker, stderr lines become
/// warnings. Both are forwarded as soon as they arrive. Returns once the
/// child has exited; non-zero exit maps to `DownloadFailed`.
pub async fn relay(
    mut child: Child,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<()> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stderr was not piped"))?;

    let mut out_lines = lines(stdout);
    let mut err_lines = lines(stderr);
    let mut tracker = ProgressTracker::new();
    let mut out_open = true;
    let mut err_open = true;

    while out_open || err_open {
        tokio::select! {
            segment = out_lines.next_segment(), if out_open => match segment? {
                Some(segment) => sink.emit(tracker.observe(&decode(segment))),
                None => out_open = false,
            },
            segment = err_lines.next_segment(), if err_open => match segment? {
                Some(segment) => sink.emit(ProgressEvent::warning(decode(segment))),
                None => err_open = false,
            },
            _ = cancel.cancelled() => {
                kill(&mut child).await?;
                return Err(Error::Cancelled);
            }
        }
    }

    let status = tokio::select! {
        status = child.wait() => status?,
        _ = cancel.cancelled() => {
            kill(&mut child).await?;
            return Err(Error::Cancelled);
        }
    };

    if status.success() {
        Ok(())
    } else {
        Err(Error::DownloadFailed(status.code()))
    }
}
