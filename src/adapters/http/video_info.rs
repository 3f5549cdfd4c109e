use crate::application::DownloadService;
use crate::domain::metadata::MetadataRecord;
use crate::error::Error;
use crate::ports::MediaExtractor;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct VideoInfoRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfoResponse {
    pub video_info: MetadataRecord,
}

pub async fn handle<E>(
    State(service): State<Arc<DownloadService<E>>>,
    Json(body): Json<VideoInfoRequest>,
) -> Result<Json<VideoInfoResponse>, Error>
where
    E: MediaExtractor + 'static,
{
    let video_info = service.fetch_metadata(&body.url).await?;
    Ok(Json(VideoInfoResponse { video_info }))
}
