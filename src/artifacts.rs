//! Debug artifacts.
//!
//! With `--debug`, every intermediate piece of text (news digests, raw model
//! drafts, continuations) is written to a timestamped file so a bad article
//! can be traced back to its inputs.

use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct Artifacts {
    dir: Option<PathBuf>,
}

impl Artifacts {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// Write `content` to `<dir>/<YYYYmmdd_HHMMSS>_<name>`.
    ///
    /// Failures are logged and ignored; returns the path on success.
    pub async fn save(&self, name: &str, content: &str) -> Option<PathBuf> {
        let dir = self.dir.as_deref()?;
        let path = artifact_path(dir, name);

        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!(dir = %dir.display(), error = %e, "Failed to create debug directory");
            return None;
        }
        match tokio::fs::write(&path, content).await {
            Ok(()) => {
                debug!(path = %path.display(), "Saved debug artifact");
                Some(path)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to save debug artifact");
                None
            }
        }
    }
}

fn artifact_path(dir: &Path, name: &str) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("{stamp}_{name}"))
}
