//! Talking to the typing server.
//!
//! [`TypingBackend`] is the seam between the UI and the network: the app only
//! ever sees it through the [`worker::ApiWorker`], which runs requests on a
//! background thread and hands results back as events.

pub mod client;
pub mod dto;
pub mod worker;

pub use client::{ApiClient, ApiConfig};
pub use dto::*;
pub use worker::{ApiJob, ApiOutcome, ApiWorker, JobQueue, StartPurpose};

use crate::error::ApiResult;

pub trait TypingBackend: Send + 'static {
    /// Establish the user identity cookie. Called once before other requests.
    fn handshake(&self) -> ApiResult<()>;
    fn list_exercises(&self) -> ApiResult<ExerciseCatalog>;
    fn exercises_for_level(&self, level: &str) -> ApiResult<Vec<Exercise>>;
    fn fetch_exercise(&self, level: &str, exercise_id: &str) -> ApiResult<Exercise>;
    fn start_session(&self, request: &StartSessionRequest) -> ApiResult<StartedSession>;
    fn submit_keystroke(
        &self,
        session_id: &str,
        request: &KeystrokeRequest,
    ) -> ApiResult<KeystrokeResponse>;
    fn complete_session(
        &self,
        session_id: &str,
        request: &CompleteSessionRequest,
    ) -> ApiResult<CompletionAck>;
    fn user_stats(&self) -> ApiResult<UserStatsReport>;
}
