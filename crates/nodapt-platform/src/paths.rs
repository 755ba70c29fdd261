use std::path::{Path, PathBuf};
use thiserror::Error;

const CACHE_DIR_NAME: &str = ".nodapt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AppPathsError {
    #[error("Could not determine home directory")]
    HomeDirUnavailable,
}

pub struct AppPaths {
    pub cache_root: PathBuf,
}

impl AppPaths {
    /// Build the default application paths for the current user.
    ///
    /// # Errors
    /// Returns an error when the user home directory cannot be determined.
    pub fn new() -> Result<Self, AppPathsError> {
        let home = dirs::home_dir().ok_or(AppPathsError::HomeDirUnavailable)?;
        Ok(Self::with_home(&home))
    }

    #[must_use]
    pub fn with_home(home: &Path) -> Self {
        Self {
            cache_root: home.join(CACHE_DIR_NAME),
        }
    }

    #[must_use]
    pub fn with_cache_root(cache_root: PathBuf) -> Self {
        Self { cache_root }
    }

    /// Scratch space for in-flight downloads and extractions.
    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.cache_root.join(".staging")
    }

    #[must_use]
    pub fn locks_dir(&self) -> PathBuf {
        self.cache_root.join(".locks")
    }

    #[must_use]
    pub fn last_used_file(&self) -> PathBuf {
        self.cache_root.join(".last-used")
    }

    /// Ensure the cache root and its bookkeeping directories exist on disk.
    ///
    /// # Errors
    /// Returns an error if any directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.cache_root)?;
        std::fs::create_dir_all(self.staging_dir())?;
        std::fs::create_dir_all(self.locks_dir())?;
        Ok(())
    }
}
