use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const MANIFEST_FILE: &str = "package.json";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Nearest `package.json` at or above `start`.
#[must_use]
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(MANIFEST_FILE))
        .find(|candidate| candidate.is_file())
}

/// The `engines.node` constraint declared by the manifest at `path`, if any.
///
/// # Errors
/// Returns an error if the file cannot be read or is not valid JSON.
pub fn read_engine_constraint(path: &Path) -> Result<Option<String>, ManifestError> {
    let contents = fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let manifest: serde_json::Value =
        serde_json::from_str(&contents).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(manifest
        .get("engines")
        .and_then(|engines| engines.get("node"))
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|constraint| !constraint.is_empty())
        .map(str::to_string))
}

/// Look up the project constraint for `start`: the nearest manifest's
/// `engines.node`, or `None` when there is no manifest or it declares none.
///
/// # Errors
/// Returns an error if the nearest manifest is unreadable.
pub fn project_constraint(start: &Path) -> Result<Option<String>, ManifestError> {
    match find_manifest(start) {
        Some(path) => read_engine_constraint(&path),
        None => Ok(None),
    }
}
