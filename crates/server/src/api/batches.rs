//! Batch lifecycle endpoints: kick off processing, poll a snapshot, or
//! subscribe to the live per-stage event stream.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::Json;
use serde::Serialize;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use triage_core::ProgressSnapshot;

use super::ApiErrorResponse;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ProcessAcceptedResponse {
    pub batch_id: Uuid,
    pub status: &'static str,
}

/// Kicks off `process_batch` as a background task and returns immediately;
/// callers track completion via `/progress` or `/stream`.
pub async fn process_batch(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<Uuid>,
) -> (StatusCode, Json<ProcessAcceptedResponse>) {
    let orchestrator = state.orchestrator.clone();
    let (managers, offices) = state.roster_snapshot().await;

    tokio::spawn(async move {
        if let Err(e) = orchestrator.process_batch(batch_id, &managers, &offices).await {
            tracing::warn!(batch_id = %batch_id, error = %e, "batch processing failed");
        }
    });

    (StatusCode::ACCEPTED, Json(ProcessAcceptedResponse { batch_id, status: "accepted" }))
}

/// Snapshot-polling endpoint; must stay consistent with the last event
/// broadcast on the same batch id.
pub async fn progress(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<Uuid>,
) -> Result<Json<ProgressSnapshot>, (StatusCode, Json<ApiErrorResponse>)> {
    state.progress_store.get_progress(batch_id).map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ApiErrorResponse { error: format!("no progress recorded for batch {batch_id}") }),
        )
    })
}

/// SSE endpoint wrapping the progress bus: subscribes once, filters the
/// global event stream down to this batch, and unsubscribes when the client
/// disconnects (the forwarding task's send fails once nothing polls `rx`).
pub async fn stream(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<Uuid>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let (sub_id, mut bus_rx) = state.progress_bus.subscribe();
    let (tx, rx) = tokio::sync::mpsc::channel(256);

    let progress_bus = state.progress_bus.clone();
    tokio::spawn(async move {
        while let Some(event) = bus_rx.recv().await {
            if event.batch_id != Some(batch_id) {
                continue;
            }
            if tx.send(event).await.is_err() {
                break;
            }
        }
        progress_bus.unsubscribe(sub_id);
    });

    let sse_stream = ReceiverStream::new(rx).map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().event(event.stage).data(data))
    });

    Sse::new(sse_stream)
}
