//! Historical stats for the dashboard screen: headline numbers, recent
//! sessions and the wpm progress series.

use chrono::{DateTime, Local, NaiveDateTime};
use tracing::{debug, error, warn};

use crate::api::{ProgressData, SessionRecord, UserStats, UserStatsReport};
use crate::error::ApiError;
use crate::time_series::{self, TimeSeriesPoint};

pub const NO_SESSIONS: &str = "No sessions recorded yet";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, PartialEq)]
pub struct StatsSummary {
    pub best_wpm: String,
    pub average_wpm: String,
    pub accuracy: String,
    pub total_sessions: String,
}

impl Default for StatsSummary {
    fn default() -> Self {
        display_stats(None)
    }
}

pub fn display_stats(stats: Option<&UserStats>) -> StatsSummary {
    let Some(stats) = stats else {
        warn!("no stats data available");
        return StatsSummary {
            best_wpm: "0.0".into(),
            average_wpm: "0.0".into(),
            accuracy: "0.0%".into(),
            total_sessions: "0".into(),
        };
    };

    StatsSummary {
        best_wpm: format!("{:.1}", stats.best_wpm.unwrap_or(0.0)),
        average_wpm: format!("{:.1}", stats.average_wpm.unwrap_or(0.0)),
        accuracy: format!("{:.1}%", stats.accuracy.unwrap_or(0.0)),
        total_sessions: stats.exercises_completed.unwrap_or(0).to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRow {
    pub date: String,
    pub exercise: String,
    pub wpm: String,
    pub accuracy: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RecentSessions {
    #[default]
    Empty,
    Rows(Vec<SessionRow>),
}

/// Server timestamps are ISO 8601, usually without an offset, in which case
/// they are taken as local time.
pub fn format_session_date(timestamp: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return dt.with_timezone(&Local).format(DATE_FORMAT).to_string();
    }
    match NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(dt) => dt.format(DATE_FORMAT).to_string(),
        Err(err) => {
            debug!(%timestamp, error = %err, "unparseable session timestamp");
            "Invalid Date".to_string()
        }
    }
}

pub fn session_row(session: &SessionRecord) -> SessionRow {
    SessionRow {
        date: format_session_date(&session.timestamp),
        exercise: session
            .exercise_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),
        wpm: format!("{:.1}", session.wpm.unwrap_or(0.0)),
        accuracy: format!("{:.1}%", session.accuracy.unwrap_or(0.0)),
        time: format!("{:.1}s", session.time_elapsed.unwrap_or(0.0)),
    }
}

pub fn display_recent_sessions(sessions: Option<&[SessionRecord]>) -> RecentSessions {
    match sessions {
        Some(sessions) if !sessions.is_empty() => {
            RecentSessions::Rows(sessions.iter().map(session_row).collect())
        }
        _ => RecentSessions::Empty,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSummary {
    pub sessions: usize,
    pub mean_wpm: f64,
    pub std_dev_wpm: f64,
}

impl ProgressSummary {
    /// Population mean and standard deviation of the wpm history.
    pub fn from_points(points: &[TimeSeriesPoint]) -> Option<Self> {
        let values = time_series::values(points);
        if values.is_empty() {
            return None;
        }
        let count = values.len() as f64;
        let mean_wpm = values.iter().sum::<f64>() / count;
        let variance = values
            .iter()
            .map(|wpm| (wpm - mean_wpm).powi(2))
            .sum::<f64>()
            / count;

        Some(Self {
            sessions: values.len(),
            mean_wpm,
            std_dev_wpm: variance.sqrt(),
        })
    }
}

/// Chart axis label for a progress point; `x` is a unix time in milliseconds.
pub fn format_progress_label(millis: f64) -> String {
    DateTime::from_timestamp_millis(millis as i64)
        .map(|dt| dt.with_timezone(&Local).format("%m-%d").to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub loading: bool,
    /// Set once any report has arrived
    pub loaded: bool,
    pub summary: StatsSummary,
    pub sessions: RecentSessions,
    pub progress: ProgressData,
    pub progress_summary: Option<ProgressSummary>,
    pub error: Option<String>,
}

impl DashboardState {
    pub fn begin_load(&mut self) {
        debug!("loading user statistics");
        self.loading = true;
    }

    pub fn apply_report(&mut self, report: UserStatsReport) {
        self.loading = false;
        self.loaded = true;
        self.error = None;
        self.summary = display_stats(report.stats.as_ref());
        self.sessions = display_recent_sessions(report.recent_sessions.as_deref());
        self.progress = report.progress_data.unwrap_or_default();
        self.progress_summary = ProgressSummary::from_points(&self.progress.wpm);
    }

    /// Keep whatever was shown before and report the failure
    pub fn apply_error(&mut self, err: &ApiError) {
        error!(error = %err, "failed to load user statistics");
        self.loading = false;
        self.error = Some(err.to_string());
    }
}
