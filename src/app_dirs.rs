use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("kasongo"),
            )
        } else {
            ProjectDirs::from("", "", "kasongo").map(|dirs| dirs.data_local_dir().to_path_buf())
        }
    }

    /// The terminal belongs to the UI, so logs go here
    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("kasongo.log"))
    }
}
