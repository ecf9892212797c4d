//! Flat-file persistence, one directory per event.
//!
//! ```text
//! <root>/events.json                  event index and the active id
//! <root>/events/<id>/players.json
//! <root>/events/<id>/highscores.json
//! ```
//!
//! Every file is replaced through a temp file and a rename. Writers of the
//! same file are serialized by a per-key mutex. A missing, empty or
//! unparsable file reads as empty.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shared::protocol::{
    EventDraft, EventInfo, Player, PlayerRegistration, ScoreEntry, ValidationError,
    DEFAULT_EVENT_ID,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Lock key of the event index. Event ids are uuids or `default`.
const INDEX_KEY: &str = "#index";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
struct EventIndex {
    active_id: String,
    events: Vec<EventInfo>,
}

impl Default for EventIndex {
    fn default() -> Self {
        Self {
            active_id: DEFAULT_EVENT_ID.to_string(),
            events: Vec::new(),
        }
    }
}

impl EventIndex {
    /// The default event always exists and a dangling active id falls back
    /// to it.
    fn normalized(mut self) -> Self {
        if !self.events.iter().any(|e| e.id == DEFAULT_EVENT_ID) {
            self.events.insert(0, EventInfo::default_event(Utc::now()));
        }
        if !self.events.iter().any(|e| e.id == self.active_id) {
            self.active_id = DEFAULT_EVENT_ID.to_string();
        }
        for event in &mut self.events {
            event.active = event.id == self.active_id;
        }
        self
    }

    fn get(&self, id: &str) -> Option<&EventInfo> {
        self.events.iter().find(|e| e.id == id)
    }

    fn active(&self) -> AppResult<EventInfo> {
        self.get(&self.active_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Active event not found".into()))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn event_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Event {id} not found"))
}

async fn read_json<T: DeserializeOwned + Default>(path: &Path) -> AppResult<T> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) if raw.trim().is_empty() => Ok(T::default()),
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unparsable store file read as empty");
                Ok(T::default())
            }
        },
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(T::default()),
        Err(err) => Err(err.into()),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, serde_json::to_vec_pretty(value)?).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

pub struct Store {
    root: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Store {
    /// Open (and if needed initialize) the storage directory.
    pub fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let store = Self {
            root,
            locks: DashMap::new(),
        };
        let index_path = store.index_path();
        if !index_path.exists() {
            let index = EventIndex::default().normalized();
            std::fs::write(&index_path, serde_json::to_vec_pretty(&index)?)?;
            info!(path = %index_path.display(), "initialized event index");
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("events.json")
    }

    fn event_dir(&self, event_id: &str) -> PathBuf {
        self.root.join("events").join(event_id)
    }

    fn scores_path(&self, event_id: &str) -> PathBuf {
        self.event_dir(event_id).join("highscores.json")
    }

    fn players_path(&self, event_id: &str) -> PathBuf {
        self.event_dir(event_id).join("players.json")
    }

    async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = self.locks.entry(key.to_string()).or_default().clone();
        mutex.lock_owned().await
    }

    /// Lock an event's files. Fails if the event was deleted while waiting.
    async fn lock_event(&self, event_id: &str) -> AppResult<OwnedMutexGuard<()>> {
        let guard = self.lock(event_id).await;
        if self.load_index().await?.get(event_id).is_none() {
            return Err(event_not_found(event_id));
        }
        Ok(guard)
    }

    async fn load_index(&self) -> AppResult<EventIndex> {
        let index: EventIndex = read_json(&self.index_path()).await?;
        Ok(index.normalized())
    }

    async fn save_index(&self, index: &EventIndex) -> AppResult<()> {
        write_json(&self.index_path(), index).await
    }

    pub async fn list_events(&self) -> AppResult<Vec<EventInfo>> {
        Ok(self.load_index().await?.events)
    }

    pub async fn active_event(&self) -> AppResult<EventInfo> {
        self.load_index().await?.active()
    }

    /// The named event, or the active one when no id is given.
    pub async fn resolve_event(&self, event_id: Option<&str>) -> AppResult<EventInfo> {
        let index = self.load_index().await?;
        match event_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => index.get(id).cloned().ok_or_else(|| event_not_found(id)),
            None => index.active(),
        }
    }

    pub async fn create_event(&self, draft: EventDraft) -> AppResult<EventInfo> {
        let name = non_blank(draft.name).ok_or(ValidationError::Blank("name"))?;
        let _guard = self.lock(INDEX_KEY).await;
        let mut index = self.load_index().await?;
        let event = EventInfo {
            id: Uuid::new_v4().to_string(),
            name,
            description: non_blank(draft.description),
            date: non_blank(draft.date),
            created_at: Utc::now(),
            active: false,
        };
        index.events.push(event.clone());
        self.save_index(&index).await?;
        info!(event_id = %event.id, name = %event.name, "event created");
        Ok(event)
    }

    /// Absent fields are kept; blank optional fields are cleared.
    pub async fn update_event(&self, event_id: &str, draft: EventDraft) -> AppResult<EventInfo> {
        let _guard = self.lock(INDEX_KEY).await;
        let mut index = self.load_index().await?;
        let event = index
            .events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or_else(|| event_not_found(event_id))?;
        if let Some(name) = draft.name {
            event.name = non_blank(Some(name)).ok_or(ValidationError::Blank("name"))?;
        }
        if let Some(description) = draft.description {
            event.description = non_blank(Some(description));
        }
        if let Some(date) = draft.date {
            event.date = non_blank(Some(date));
        }
        let updated = event.clone();
        self.save_index(&index).await?;
        Ok(updated)
    }

    pub async fn activate_event(&self, event_id: &str) -> AppResult<EventInfo> {
        let _guard = self.lock(INDEX_KEY).await;
        let mut index = self.load_index().await?;
        if index.get(event_id).is_none() {
            return Err(event_not_found(event_id));
        }
        index.active_id = event_id.to_string();
        let index = index.normalized();
        self.save_index(&index).await?;
        info!(event_id, "event activated");
        index.active()
    }

    pub async fn delete_event(&self, event_id: &str) -> AppResult<()> {
        let _guard = self.lock(INDEX_KEY).await;
        let mut index = self.load_index().await?;
        if index.get(event_id).is_none() {
            return Err(event_not_found(event_id));
        }
        if event_id == DEFAULT_EVENT_ID {
            return Err(AppError::Conflict("The default event cannot be deleted".into()));
        }
        if event_id == index.active_id {
            return Err(AppError::Conflict("The active event cannot be deleted".into()));
        }
        let _event_guard = self.lock(event_id).await;
        index.events.retain(|e| e.id != event_id);
        self.save_index(&index).await?;
        match tokio::fs::remove_dir_all(self.event_dir(event_id)).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        self.locks.remove(event_id);
        info!(event_id, "event deleted");
        Ok(())
    }

    pub async fn scores(&self, event_id: &str) -> AppResult<Vec<ScoreEntry>> {
        read_json(&self.scores_path(event_id)).await
    }

    pub async fn add_score(&self, event_id: &str, entry: ScoreEntry) -> AppResult<()> {
        let _guard = self.lock_event(event_id).await?;
        let path = self.scores_path(event_id);
        let mut scores: Vec<ScoreEntry> = read_json(&path).await?;
        scores.push(entry);
        write_json(&path, &scores).await?;
        debug!(event_id, count = scores.len(), "score appended");
        Ok(())
    }

    pub async fn clear_scores(&self, event_id: &str) -> AppResult<()> {
        let _guard = self.lock_event(event_id).await?;
        write_json(&self.scores_path(event_id), &Vec::<ScoreEntry>::new()).await
    }

    pub async fn players(&self, event_id: &str) -> AppResult<Vec<Player>> {
        read_json(&self.players_path(event_id)).await
    }

    /// Register a player; an email already registered for the event
    /// (trimmed, case-insensitive) is a conflict.
    pub async fn register_player(
        &self,
        event_id: &str,
        registration: PlayerRegistration,
    ) -> AppResult<Player> {
        registration.validate()?;
        let name = registration.name.trim().to_string();
        let email = registration.email.trim().to_string();
        let email_key = email.to_lowercase();

        let _guard = self.lock_event(event_id).await?;
        let path = self.players_path(event_id);
        let mut players: Vec<Player> = read_json(&path).await?;
        if players
            .iter()
            .any(|p| p.email.trim().to_lowercase() == email_key)
        {
            return Err(AppError::Conflict("Email already registered".into()));
        }
        let player = Player {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            created_at: Utc::now(),
        };
        players.push(player.clone());
        write_json(&path, &players).await?;
        info!(event_id, player = %player.name, "player registered");
        Ok(player)
    }

    pub async fn clear_players(&self, event_id: &str) -> AppResult<()> {
        let _guard = self.lock_event(event_id).await?;
        write_json(&self.players_path(event_id), &Vec::<Player>::new()).await
    }

    /// Whether a player or a score of the event already uses `name`
    /// (case-insensitive).
    pub async fn name_taken(&self, event_id: &str, name: &str) -> AppResult<bool> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return Ok(false);
        }
        let players = self.players(event_id).await?;
        if players.iter().any(|p| p.name.trim().to_lowercase() == wanted) {
            return Ok(true);
        }
        let scores = self.scores(event_id).await?;
        Ok(scores.iter().any(|s| s.name.trim().to_lowercase() == wanted))
    }
}
