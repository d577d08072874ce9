use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_APP_NAME, DEFAULT_BACKUP_DIR, DEFAULT_LOCK_DIR, DEFAULT_LOCK_RETRIES};

/// Engine settings. Every field has a production default; missing keys in a
/// JSON document fall back to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Names the lock file (`<lock_dir>/<app_name>.pid`).
    pub app_name: String,
    pub lock_dir: PathBuf,
    /// Where `RestorableFile` keeps its copies.
    pub backup_dir: PathBuf,
    /// How many times a lock left by a dead process is reclaimed before giving up.
    pub lock_retries: u32,
    /// Zero timestamps and drop volatile fields from emitted facts.
    pub redact_facts: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            lock_dir: PathBuf::from(DEFAULT_LOCK_DIR),
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            lock_retries: DEFAULT_LOCK_RETRIES,
            redact_facts: false,
        }
    }
}

impl EngineConfig {
    /// Defaults with the lock and backup directories placed under `root`.
    /// Meant for tests and staging hosts.
    #[must_use]
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            lock_dir: root.join("lock"),
            backup_dir: root.join("backup"),
            ..Self::default()
        }
    }

    /// # Errors
    /// Returns the `serde_json` error for malformed input or unknown field types.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    #[must_use]
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    #[must_use]
    pub fn with_lock_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lock_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_lock_retries(mut self, retries: u32) -> Self {
        self.lock_retries = retries;
        self
    }

    #[must_use]
    pub fn with_redacted_facts(mut self, redact: bool) -> Self {
        self.redact_facts = redact;
        self
    }

    #[must_use]
    pub fn pidfile(&self) -> PathBuf {
        self.lock_dir.join(format!("{}.pid", self.app_name))
    }
}
