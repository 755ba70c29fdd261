use std::path::PathBuf;

use nodapt_platform::{AppPaths, AppPathsError, default_mirror};

pub const MIRROR_VAR: &str = "NODE_MIRROR";
pub const CACHE_ROOT_VAR: &str = "NODE_ENV_DIR";
pub const DEBUG_VAR: &str = "DEBUG";

/// Settings taken from the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub mirror: String,
    pub cache_root: PathBuf,
    pub debug: bool,
}

impl Config {
    /// Read configuration from the real process environment.
    ///
    /// # Errors
    /// Returns an error when `NODE_ENV_DIR` is unset and the home directory
    /// cannot be determined.
    pub fn from_env() -> Result<Self, AppPathsError> {
        Self::from_lookup(
            |name| std::env::var(name).ok(),
            || AppPaths::new().map(|paths| paths.cache_root),
        )
    }

    /// Build configuration from an arbitrary variable lookup. `default_root`
    /// is only consulted when `NODE_ENV_DIR` is unset or blank.
    ///
    /// # Errors
    /// Propagates the error from `default_root`.
    pub fn from_lookup<F, D>(lookup: F, default_root: D) -> Result<Self, AppPathsError>
    where
        F: Fn(&str) -> Option<String>,
        D: FnOnce() -> Result<PathBuf, AppPathsError>,
    {
        let non_blank = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let mirror = non_blank(MIRROR_VAR).unwrap_or_else(|| default_mirror(&lookup).to_string());
        let cache_root = match non_blank(CACHE_ROOT_VAR) {
            Some(dir) => PathBuf::from(dir),
            None => default_root()?,
        };
        let debug = lookup(DEBUG_VAR).is_some_and(|value| value.trim() == "1");

        Ok(Self {
            mirror,
            cache_root,
            debug,
        })
    }
}
