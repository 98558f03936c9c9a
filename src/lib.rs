// Library surface for the binary and for headless/integration tests.
pub mod api;
pub mod app;
pub mod app_dirs;
pub mod audio;
pub mod config;
pub mod dashboard;
pub mod effects;
pub mod error;
pub mod exercises;
pub mod logging;
pub mod metrics;
pub mod runtime;
pub mod session;
pub mod time_series;
pub mod ui;

pub use app::{App, AppState, Control, TICK_RATE_MS};
