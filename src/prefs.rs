// Local preference flags, stored as a small JSON file. Best-effort only.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use crate::error::StorageError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub queries_paused: bool,
}

#[derive(Debug, Clone)]
pub struct PrefsStore {
    path: PathBuf,
}

impl PrefsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A missing file is not an error.
    pub fn load(&self) -> Result<Preferences, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) => Ok(serde_json::from_str(&s)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Preferences::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, prefs: &Preferences) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(prefs)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn load_or_default(&self) -> Preferences {
        self.load().unwrap_or_else(|e| {
            warn!(error = %e, path = %self.path.display(), "ignoring unreadable preferences");
            Preferences::default()
        })
    }

    pub fn save_or_log(&self, prefs: &Preferences) {
        if let Err(e) = self.save(prefs) {
            warn!(error = %e, path = %self.path.display(), "failed to save preferences");
        }
    }
}
