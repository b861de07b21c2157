//! Platform paths for TaskDesk configuration and session data.
//!
//! ```text
//! ~/.config/taskdesk/          # Config directory (platform equivalent elsewhere)
//! ├── config.toml              # Client configuration
//! └── session.json             # Persisted session bundle
//! ```

use std::path::PathBuf;
use taskdesk_core::error::{Result, TaskdeskError};

const APP_DIR: &str = "taskdesk";
const CONFIG_FILE: &str = "config.toml";
const SESSION_FILE: &str = "session.json";

pub struct TaskdeskPaths;

impl TaskdeskPaths {
    /// Returns the TaskDesk configuration directory.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| TaskdeskError::config("Cannot find the platform config directory"))
    }

    /// Default location of `config.toml`.
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Location of the durable key-value file backing the session store.
    pub fn session_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(SESSION_FILE))
    }
}
