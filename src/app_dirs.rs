use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Default log file. The terminal is taken over by the UI, so logs go here
    /// rather than to stderr.
    pub fn log_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("livetick");
            Some(state_dir.join("livetick.log"))
        } else {
            ProjectDirs::from("", "", "livetick")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("livetick.log"))
        }
    }
}
