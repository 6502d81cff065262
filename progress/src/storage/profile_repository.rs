use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use shared::{ChildProgress, UserProfile};

use super::connection::ProfileConnection;
use super::traits::ProfileStorage;

/// YAML-file profile repository
#[derive(Debug, Clone)]
pub struct ProfileRepository {
    connection: ProfileConnection,
}

impl ProfileRepository {
    pub fn new(connection: ProfileConnection) -> Self {
        Self { connection }
    }

    /// Read a YAML document. Absent or unparsable files are `None`.
    fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            debug!("{} does not exist yet", path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        match serde_yaml::from_str(&content) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Ignoring malformed {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    /// Write through a sibling temp file so a crash never leaves half a document
    fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
        let yaml = serde_yaml::to_string(value)?;
        let tmp_path = path.with_extension("yaml.tmp");
        fs::write(&tmp_path, yaml)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

impl ProfileStorage for ProfileRepository {
    fn load_progress(&self) -> Result<Option<ChildProgress>> {
        Self::read_yaml(&self.connection.progress_file_path())
    }

    fn save_progress(&self, progress: &ChildProgress) -> Result<()> {
        Self::write_yaml(&self.connection.progress_file_path(), progress)?;
        debug!(
            "Saved progress for {}: {} stars, level {}",
            progress.name, progress.total_stars, progress.level
        );
        Ok(())
    }

    fn load_user(&self) -> Result<Option<UserProfile>> {
        Self::read_yaml(&self.connection.user_file_path())
    }

    fn save_user(&self, user: &UserProfile) -> Result<()> {
        Self::write_yaml(&self.connection.user_file_path(), user)
    }
}
