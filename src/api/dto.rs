//! Request and response bodies of the typing server.
//!
//! Every response is a JSON envelope carrying `status` and an optional
//! `message` next to the payload fields. The server is loose about missing
//! fields, so most of them default.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::metrics::TypingMetrics;
use crate::time_series::TimeSeriesPoint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
}

impl Exercise {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExerciseBody {
    pub exercise: Exercise,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExerciseListBody {
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

/// Exercises grouped by level name
pub type ExerciseCatalog = BTreeMap<String, Vec<Exercise>>;

#[derive(Debug, Deserialize)]
pub(crate) struct ExerciseCatalogBody {
    #[serde(default)]
    pub exercises: ExerciseCatalog,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise_id: Option<String>,
}

impl StartSessionRequest {
    pub fn random(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            exercise_id: None,
        }
    }

    pub fn for_exercise(level: impl Into<String>, exercise_id: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            exercise_id: Some(exercise_id.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StartedSession {
    pub session_id: String,
    pub exercise: Exercise,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeystrokeRequest {
    pub key: String,
    pub exercise_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct KeystrokeResult {
    pub correct: bool,
    pub complete: bool,
    pub position: usize,
    pub remaining: usize,
    pub time_elapsed: f64,
    pub time_remaining: f64,
    pub time_completed: bool,
    pub text_completed: bool,
}

/// Metrics as the server computes them
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerMetrics {
    pub wpm: f64,
    pub accuracy: f64,
    pub time_elapsed: f64,
    pub errors: usize,
    pub char_count: usize,
    pub total_keystrokes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct KeystrokeResponse {
    #[serde(default)]
    pub result: Option<KeystrokeResult>,
    #[serde(default)]
    pub metrics: Option<ServerMetrics>,
}

/// Final metrics saved when a session completes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionResults {
    pub wpm: f64,
    pub accuracy: f64,
    pub time_elapsed: f64,
    pub errors: usize,
}

impl From<&TypingMetrics> for SessionResults {
    fn from(m: &TypingMetrics) -> Self {
        Self {
            wpm: m.wpm,
            accuracy: m.accuracy,
            time_elapsed: m.time_elapsed,
            errors: m.errors,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompleteSessionRequest {
    pub exercise_id: String,
    pub metrics: SessionResults,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompletionAck {
    #[serde(default)]
    pub message: Option<String>,
}

/// Aggregate stats of the current user. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UserStats {
    pub best_wpm: Option<f64>,
    pub average_wpm: Option<f64>,
    pub total_time: Option<f64>,
    pub exercises_completed: Option<u64>,
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionRecord {
    pub timestamp: String,
    pub exercise_id: Option<String>,
    pub wpm: Option<f64>,
    pub accuracy: Option<f64>,
    pub time_elapsed: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProgressData {
    pub wpm: Vec<TimeSeriesPoint>,
    pub accuracy: Vec<TimeSeriesPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UserStatsReport {
    pub stats: Option<UserStats>,
    pub recent_sessions: Option<Vec<SessionRecord>>,
    pub progress_data: Option<ProgressData>,
}
