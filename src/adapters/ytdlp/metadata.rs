use super::cmd::ToolRunner;
use crate::domain::metadata::MetadataRecord;
use crate::error::{Error, Result};

/// Ask the tool for one JSON document describing `url`.
pub async fn fetch(runner: &impl ToolRunner, url: &str) -> Result<MetadataRecord> {
    let url = url.trim();
    if url.is_empty() {
        return Err(Error::validation("URL is required"));
    }

    let output = runner.dump_metadata(url).await?;

    if !output.status.success() {
        let err = Error::extraction_failed(&output.stderr);
        tracing::warn!(url, status = %output.status, error = %err, "metadata extraction failed");
        return Err(err);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    MetadataRecord::from_json(&stdout).map_err(|e| {
        tracing::warn!(url, error = %e, "tool returned unparseable metadata");
        Error::MalformedMetadata(e)
    })
}
