use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const DATA_DIR_ENV: &str = "BRAINQUEST_DATA_DIR";

/// ProfileConnection owns the directory holding the profile files
#[derive(Debug, Clone)]
pub struct ProfileConnection {
    base_directory: PathBuf,
}

impl ProfileConnection {
    /// Create a connection rooted at `base_directory`, creating it if needed
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }

        Ok(Self {
            base_directory: base_path,
        })
    }

    /// Create a connection in the default data directory.
    /// Uses `$BRAINQUEST_DATA_DIR` when set, else ~/Documents/BrainQuest.
    pub fn new_default() -> Result<Self> {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            info!("Using profile directory from {}: {}", DATA_DIR_ENV, dir);
            return Self::new(dir);
        }

        let home_dir = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| anyhow::anyhow!("Could not determine home directory"))?;

        let data_dir = PathBuf::from(home_dir).join("Documents").join("BrainQuest");
        info!("Using default profile directory: {}", data_dir.display());
        Self::new(data_dir)
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn progress_file_path(&self) -> PathBuf {
        self.base_directory.join("progress.yaml")
    }

    pub fn user_file_path(&self) -> PathBuf {
        self.base_directory.join("user.yaml")
    }
}
