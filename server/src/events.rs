use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream, StreamExt};
use shared::protocol::{EventDraft, EventInfo};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::SharedState;

/// Capacity of the active-event channel; a lagging subscriber skips ahead.
pub const ACTIVE_CHANNEL_CAPACITY: usize = 16;

pub async fn list_events(State(state): State<SharedState>) -> AppResult<Json<Vec<EventInfo>>> {
    Ok(Json(state.store.list_events().await?))
}

pub async fn active_event(State(state): State<SharedState>) -> AppResult<Json<EventInfo>> {
    Ok(Json(state.store.active_event().await?))
}

pub async fn create_event(
    State(state): State<SharedState>,
    payload: Result<Json<EventDraft>, axum::extract::rejection::JsonRejection>,
) -> AppResult<(StatusCode, Json<EventInfo>)> {
    let Json(draft) = payload?;
    let event = state.store.create_event(draft).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update_event(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Json<EventDraft>, axum::extract::rejection::JsonRejection>,
) -> AppResult<Json<EventInfo>> {
    let Json(draft) = payload?;
    let event = state.store.update_event(&id, draft).await?;
    if event.active {
        state.publish_active(event.clone());
    }
    Ok(Json(event))
}

pub async fn activate_event(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> AppResult<Json<EventInfo>> {
    let event = state.store.activate_event(&id).await?;
    state.publish_active(event.clone());
    Ok(Json(event))
}

pub async fn delete_event(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.store.delete_event(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn active_frame(event: &EventInfo) -> Result<Event, axum::Error> {
    Event::default().event("active").json_data(event)
}

/// Changes of the active event after `rx` was subscribed.
fn changes(rx: broadcast::Receiver<EventInfo>) -> impl Stream<Item = EventInfo> {
    stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => return Some((event, rx)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "active-event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
}

/// `event: active` frames: the current active event, then every change.
pub async fn active_stream(
    State(state): State<SharedState>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    // subscribe before reading so no change is missed in between
    let rx = state.subscribe_active();
    let current = state.store.active_event().await?;
    debug!(event_id = %current.id, "active-event stream opened");

    let frames = stream::once(async move { current })
        .chain(changes(rx))
        .map(|event| active_frame(&event));
    Ok(Sse::new(frames).keep_alive(KeepAlive::default()))
}
