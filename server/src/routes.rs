use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use shared::protocol::{NameAvailability, Player, PlayerRegistration, ScoreEntry, ScoreSubmission};
use shared::ranking::{rank, top, HighscoreQuery};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::SharedState;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventScope {
    pub event_id: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct HighscoreParams {
    pub event_id: Option<String>,
    pub limit: Option<String>,
    pub unique_email: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct NameParams {
    pub event_id: Option<String>,
    pub name: Option<String>,
}

pub async fn submit_score(
    State(state): State<SharedState>,
    Query(scope): Query<EventScope>,
    payload: Result<Json<ScoreSubmission>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ScoreEntry>)> {
    let Json(submission) = payload?;
    let event = state.store.resolve_event(scope.event_id.as_deref()).await?;
    let entry = ScoreEntry::record(Uuid::new_v4().to_string(), submission, Utc::now())?;
    state.store.add_score(&event.id, entry.clone()).await?;
    info!(
        event_id = %event.id,
        name = %entry.name,
        cps = entry.cps,
        chars = entry.chars_typed,
        "score recorded"
    );
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn highscores(
    State(state): State<SharedState>,
    Query(params): Query<HighscoreParams>,
) -> AppResult<Json<Vec<ScoreEntry>>> {
    let event = state.store.resolve_event(params.event_id.as_deref()).await?;
    let query = HighscoreQuery::from_params(params.limit.as_deref(), params.unique_email.as_deref());
    let scores = state.store.scores(&event.id).await?;
    Ok(Json(rank(scores, &query)))
}

pub async fn top_score(
    State(state): State<SharedState>,
    Query(scope): Query<EventScope>,
) -> AppResult<Json<ScoreEntry>> {
    let event = state.store.resolve_event(scope.event_id.as_deref()).await?;
    let scores = state.store.scores(&event.id).await?;
    top(&scores)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No scores yet".into()))
}

pub async fn clear_highscores(
    State(state): State<SharedState>,
    Query(scope): Query<EventScope>,
) -> AppResult<StatusCode> {
    let event = state.store.resolve_event(scope.event_id.as_deref()).await?;
    state.store.clear_scores(&event.id).await?;
    info!(event_id = %event.id, "highscores cleared");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn register_player(
    State(state): State<SharedState>,
    Query(scope): Query<EventScope>,
    payload: Result<Json<PlayerRegistration>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Player>)> {
    let Json(registration) = payload?;
    let event = state.store.resolve_event(scope.event_id.as_deref()).await?;
    let player = state.store.register_player(&event.id, registration).await?;
    Ok((StatusCode::CREATED, Json(player)))
}

pub async fn list_players(
    State(state): State<SharedState>,
    Query(scope): Query<EventScope>,
) -> AppResult<Json<Vec<Player>>> {
    let event = state.store.resolve_event(scope.event_id.as_deref()).await?;
    Ok(Json(state.store.players(&event.id).await?))
}

pub async fn clear_players(
    State(state): State<SharedState>,
    Query(scope): Query<EventScope>,
) -> AppResult<StatusCode> {
    let event = state.store.resolve_event(scope.event_id.as_deref()).await?;
    state.store.clear_players(&event.id).await?;
    info!(event_id = %event.id, "players cleared");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn check_name(
    State(state): State<SharedState>,
    Query(params): Query<NameParams>,
) -> AppResult<Json<NameAvailability>> {
    let event = state.store.resolve_event(params.event_id.as_deref()).await?;
    let name = params.name.unwrap_or_default();
    let taken = state.store.name_taken(&event.id, &name).await?;
    Ok(Json(NameAvailability { available: !taken }))
}
