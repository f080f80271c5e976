//! Storage layout configuration

use std::path::PathBuf;

use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// On-disk layout for the deployment core
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Get the settings file path
    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }

    /// Get the backups directory
    pub fn backups_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("backups"))
    }

    /// Get the audit log file path
    pub fn audit_file(&self) -> File {
        File::new(self.base_dir.join("audit").join("audit.jsonl"))
    }

    /// Get the logs directory
    pub fn logs_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("logs"))
    }

    /// Setup the storage layout (create directories)
    pub async fn setup(&self) -> Result<(), crate::errors::CoreError> {
        self.backups_dir().create().await?;
        self.logs_dir().create().await?;
        Dir::new(self.base_dir.join("audit")).create().await?;
        Ok(())
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        // Use /etc/nucleus on Linux, or user home directory on other platforms
        #[cfg(target_os = "linux")]
        let base_dir = PathBuf::from("/etc/nucleus");

        #[cfg(not(target_os = "linux"))]
        let base_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".nucleus");

        Self::new(base_dir)
    }
}

// Add dirs crate functionality inline for cross-platform support
#[cfg(not(target_os = "linux"))]
mod dirs {
    use std::path::PathBuf;

    pub fn home_dir() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
    }
}
