//! Background thread that runs server requests in submission order.
//!
//! The UI never blocks on the network: it queues an [`ApiJob`] and later
//! receives the matching [`ApiOutcome`] as an [`AppEvent::Api`]. Outcomes
//! carry enough context (session id, typed input) for the app to tell whether
//! they still apply.

use std::sync::mpsc::{self, Sender};
use std::thread;

use tracing::{debug, warn};

use super::dto::*;
use super::TypingBackend;
use crate::error::{ApiError, ApiResult};
use crate::runtime::AppEvent;

/// What a session start was for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPurpose {
    /// Random exercise after the pre-countdown
    New,
    /// A specific exercise picked by level and id
    Load,
    /// Same exercise again
    Retry,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiJob {
    ListExercises {
        level: Option<String>,
    },
    FetchExercise {
        level: String,
        exercise_id: String,
    },
    StartSession {
        request: StartSessionRequest,
        purpose: StartPurpose,
        /// Echoed back so the app can tell which start answered
        ticket: u64,
    },
    SubmitKeystroke {
        session_id: String,
        request: KeystrokeRequest,
        /// Full input at the time the key was typed
        input: String,
    },
    CompleteSession {
        session_id: String,
        request: CompleteSessionRequest,
    },
    LoadUserStats,
}

#[derive(Debug)]
pub enum ApiOutcome {
    Connected(ApiResult<()>),
    Exercises {
        level: Option<String>,
        result: ApiResult<ExerciseCatalog>,
    },
    Exercise {
        level: String,
        result: ApiResult<Exercise>,
    },
    SessionStarted {
        purpose: StartPurpose,
        ticket: u64,
        result: ApiResult<StartedSession>,
    },
    Keystroke {
        session_id: String,
        input: String,
        result: ApiResult<KeystrokeResponse>,
    },
    SessionSaved {
        session_id: String,
        result: ApiResult<CompletionAck>,
    },
    UserStats(ApiResult<UserStatsReport>),
}

/// Run one job against the backend.
pub fn run_job<B: TypingBackend + ?Sized>(backend: &B, job: ApiJob) -> ApiOutcome {
    match job {
        ApiJob::ListExercises { level } => {
            let result = match &level {
                Some(level) => backend
                    .exercises_for_level(level)
                    .map(|list| ExerciseCatalog::from([(level.clone(), list)])),
                None => backend.list_exercises(),
            };
            ApiOutcome::Exercises { level, result }
        }
        ApiJob::FetchExercise { level, exercise_id } => {
            let result = backend.fetch_exercise(&level, &exercise_id);
            ApiOutcome::Exercise { level, result }
        }
        ApiJob::StartSession {
            request,
            purpose,
            ticket,
        } => ApiOutcome::SessionStarted {
            purpose,
            ticket,
            result: backend.start_session(&request),
        },
        ApiJob::SubmitKeystroke {
            session_id,
            request,
            input,
        } => {
            let result = backend.submit_keystroke(&session_id, &request);
            ApiOutcome::Keystroke {
                session_id,
                input,
                result,
            }
        }
        ApiJob::CompleteSession {
            session_id,
            request,
        } => {
            let result = backend.complete_session(&session_id, &request);
            ApiOutcome::SessionSaved { session_id, result }
        }
        ApiJob::LoadUserStats => ApiOutcome::UserStats(backend.user_stats()),
    }
}

/// Where the app queues jobs
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: Sender<ApiJob>,
}

impl JobQueue {
    pub fn new(tx: Sender<ApiJob>) -> Self {
        Self { tx }
    }

    pub fn submit(&self, job: ApiJob) -> ApiResult<()> {
        self.tx.send(job).map_err(|_| ApiError::Disconnected)
    }
}

pub struct ApiWorker {
    handle: thread::JoinHandle<()>,
}

impl ApiWorker {
    /// Spawn the worker. It performs the handshake first, then serves jobs
    /// until either side of its channels goes away.
    pub fn spawn<B: TypingBackend>(backend: B, events: Sender<AppEvent>) -> (Self, JobQueue) {
        let (tx, rx) = mpsc::channel::<ApiJob>();

        let handle = thread::spawn(move || {
            let connected = backend.handshake();
            if let Err(err) = &connected {
                warn!(error = %err, "server handshake failed");
            }
            if events.send(AppEvent::Api(ApiOutcome::Connected(connected))).is_err() {
                return;
            }

            for job in rx {
                debug!(?job, "running api job");
                let outcome = run_job(&backend, job);
                if events.send(AppEvent::Api(outcome)).is_err() {
                    break;
                }
            }
        });

        (Self { handle }, JobQueue::new(tx))
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
