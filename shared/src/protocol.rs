//! JSON types exchanged between the race screen and the leaderboard server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cps::{duration_seconds, submitted_cps};

/// Id of the event that always exists and cannot be deleted.
pub const DEFAULT_EVENT_ID: &str = "default";

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("either durationMs or durationSeconds must be provided")]
    MissingDuration,
    #[error("{0} must be positive")]
    NonPositive(&'static str),
    #[error("accuracy must be between 0 and 1")]
    AccuracyOutOfRange,
    #[error("{0} must not be blank")]
    Blank(&'static str),
}

/// Body of `POST /api/scores`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSubmission {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub chars_typed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl ScoreSubmission {
    /// Precise duration in milliseconds; `durationMs` wins over
    /// `durationSeconds`.
    pub fn validated_duration_ms(&self) -> Result<u64, ValidationError> {
        if let Some(accuracy) = self.accuracy {
            if !(0.0..=1.0).contains(&accuracy) {
                return Err(ValidationError::AccuracyOutOfRange);
            }
        }
        match (self.duration_ms, self.duration_seconds) {
            (Some(0), _) => Err(ValidationError::NonPositive("durationMs")),
            (Some(ms), _) => Ok(ms),
            (None, Some(0)) => Err(ValidationError::NonPositive("durationSeconds")),
            (None, Some(secs)) => Ok(secs.saturating_mul(1000)),
            (None, None) => Err(ValidationError::MissingDuration),
        }
    }
}

/// A recorded score. CPS is computed from `chars_typed` and the duration at
/// submission time; nothing client-computed is trusted beyond those two.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub cps: f64,
    pub chars_typed: u64,
    pub duration_seconds: u64,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl ScoreEntry {
    pub fn record(
        id: String,
        submission: ScoreSubmission,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let duration_ms = submission.validated_duration_ms()?;
        Ok(Self {
            id,
            cps: submitted_cps(submission.chars_typed, duration_ms),
            name: submission.name,
            email: submission.email,
            chars_typed: submission.chars_typed,
            duration_seconds: duration_seconds(duration_ms),
            duration_ms,
            accuracy: submission.accuracy,
            timestamp,
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlayerRegistration {
    pub name: String,
    pub email: String,
}

impl PlayerRegistration {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::Blank("name"));
        }
        if self.email.trim().is_empty() {
            return Err(ValidationError::Blank("email"));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NameAvailability {
    pub available: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventInfo {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub active: bool,
}

impl EventInfo {
    pub fn default_event(created_at: DateTime<Utc>) -> Self {
        Self {
            id: DEFAULT_EVENT_ID.to_string(),
            name: "Default".to_string(),
            description: None,
            date: None,
            created_at,
            active: true,
        }
    }
}

/// Body of `POST /api/events` and `PUT /api/events/:id`. On update, absent
/// fields are left alone and empty strings clear the optional ones.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct EventDraft {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Error body of every non-2xx API response.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
