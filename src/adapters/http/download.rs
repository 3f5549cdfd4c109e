use crate::application::{DownloadService, Subscription};
use crate::domain::download::DownloadRequest;
use crate::ports::MediaExtractor;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const DOWNLOAD_ID_HEADER: &str = "x-download-id";

const KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Turn a subscription into a `text/event-stream` response of `data:` frames.
fn event_stream(subscription: Subscription) -> Response {
    let id = subscription.download_id().to_string();
    let events = subscription
        .into_stream()
        .map(|event| Event::default().json_data(event));
    let sse = Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE));
    ([(DOWNLOAD_ID_HEADER, id)], sse).into_response()
}

fn start<E>(service: &Arc<DownloadService<E>>, request: DownloadRequest) -> Response
where
    E: MediaExtractor + 'static,
{
    match service.start_download(&request) {
        Ok(subscription) => event_stream(subscription),
        Err(e) => e.into_response(),
    }
}

/// `POST /api/download` with a JSON body.
pub async fn post<E>(
    State(service): State<Arc<DownloadService<E>>>,
    Json(request): Json<DownloadRequest>,
) -> Response
where
    E: MediaExtractor + 'static,
{
    start(&service, request)
}

/// `GET /api/download?url=..&formatId=..`, usable from `EventSource`.
pub async fn get<E>(
    State(service): State<Arc<DownloadService<E>>>,
    Query(request): Query<DownloadRequest>,
) -> Response
where
    E: MediaExtractor + 'static,
{
    start(&service, request)
}

/// `GET /api/downloads/:id/events`: attach to a running or recently finished download.
pub async fn attach<E>(
    State(service): State<Arc<DownloadService<E>>>,
    Path(id): Path<Uuid>,
) -> Response
where
    E: MediaExtractor + 'static,
{
    match service.subscribe(&id) {
        Some(subscription) => event_stream(subscription),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Unknown download" })),
        )
            .into_response(),
    }
}
