pub mod config;
pub mod error;
pub mod events;
pub mod routes;
pub mod store;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use shared::protocol::EventInfo;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::debug;

use crate::store::Store;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub store: Store,
    active_tx: broadcast::Sender<EventInfo>,
}

impl AppState {
    pub fn open(storage_dir: impl Into<PathBuf>) -> std::io::Result<SharedState> {
        let (active_tx, _) = broadcast::channel(events::ACTIVE_CHANNEL_CAPACITY);
        Ok(Arc::new(Self {
            store: Store::open(storage_dir)?,
            active_tx,
        }))
    }

    pub fn subscribe_active(&self) -> broadcast::Receiver<EventInfo> {
        self.active_tx.subscribe()
    }

    /// Tell every open stream about the active event. Having no listener is
    /// not an error.
    pub fn publish_active(&self, event: EventInfo) {
        let listeners = self.active_tx.send(event).unwrap_or(0);
        debug!(listeners, "active event published");
    }
}

/// The JSON API. Static files are layered on by the binary.
pub fn app(state: SharedState) -> Router {
    Router::new()
        .route("/api/scores", post(routes::submit_score))
        .route(
            "/api/highscores",
            get(routes::highscores).delete(routes::clear_highscores),
        )
        .route("/api/highscores/top", get(routes::top_score))
        .route(
            "/api/players",
            get(routes::list_players)
                .post(routes::register_player)
                .delete(routes::clear_players),
        )
        .route("/api/players/check-name", get(routes::check_name))
        .route(
            "/api/events",
            get(events::list_events).post(events::create_event),
        )
        .route("/api/events/active", get(events::active_event))
        .route("/api/events/active/stream", get(events::active_stream))
        .route(
            "/api/events/:id",
            put(events::update_event).delete(events::delete_event),
        )
        .route("/api/events/:id/activate", post(events::activate_event))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
