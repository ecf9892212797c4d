use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use shared::protocol::{
    EventInfo, NameAvailability, Player, PlayerRegistration, ScoreEntry, ScoreSubmission,
};
use shared::race::ScoreApi;
use shared::ranking::HighscoreQuery;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {0}")]
    Status(StatusCode),
    #[error("no browser window")]
    NoWindow,
}

impl ApiError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Status(StatusCode::CONFLICT))
    }
}

/// JSON client for the leaderboard server. Requests target the active
/// event.
#[derive(Clone, Debug)]
pub struct ApiClient {
    base: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// reqwest needs absolute URLs, so the page origin is the base.
    pub fn from_location() -> Result<Self, ApiError> {
        let origin = web_sys::window()
            .and_then(|w| w.location().origin().ok())
            .ok_or(ApiError::NoWindow)?;
        Ok(Self::with_base(origin))
    }

    pub fn with_base(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }
        Ok(response.json().await?)
    }

    pub async fn active_event(&self) -> Result<EventInfo, ApiError> {
        let response = self.http.get(self.url("/api/events/active")).send().await?;
        Self::read(response).await
    }

    pub async fn register_player(&self, registration: &PlayerRegistration) -> Result<Player, ApiError> {
        let response = self
            .http
            .post(self.url("/api/players"))
            .json(registration)
            .send()
            .await?;
        Self::read(response).await
    }

    pub async fn check_name(&self, name: &str) -> Result<NameAvailability, ApiError> {
        let name: String = js_sys::encode_uri_component(name).into();
        let response = self
            .http
            .get(self.url(&format!("/api/players/check-name?name={name}")))
            .send()
            .await?;
        Self::read(response).await
    }
}

impl ScoreApi for ApiClient {
    type Error = ApiError;

    async fn submit_score(&self, submission: &ScoreSubmission) -> Result<ScoreEntry, ApiError> {
        let response = self
            .http
            .post(self.url("/api/scores"))
            .json(submission)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn highscores(&self, query: &HighscoreQuery) -> Result<Vec<ScoreEntry>, ApiError> {
        let url = self.url(&format!("/api/highscores?{}", query.to_query_string()));
        let response = self.http.get(url).send().await?;
        Self::read(response).await
    }

    async fn top_score(&self) -> Result<Option<ScoreEntry>, ApiError> {
        let response = self.http.get(self.url("/api/highscores/top")).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::read(response).await.map(Some)
    }
}
