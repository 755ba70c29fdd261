use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::{debug, warn};
use thiserror::Error;

use nodapt_backend::{InstalledVersion, NodeVersion};
use nodapt_platform::{AppPaths, Platform};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{version} is not installed")]
    NotInstalled { version: NodeVersion },
    #[error("{context} {}: {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    fn io(context: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// The on-disk registry of installed runtimes.
///
/// Each runtime lives in `<root>/v<version>`. A directory only counts as
/// installed when it contains the platform entry point, so scratch space and
/// orphaned directories stay invisible.
pub struct VersionStore {
    paths: AppPaths,
    platform: Platform,
}

impl VersionStore {
    #[must_use]
    pub fn new(cache_root: PathBuf, platform: Platform) -> Self {
        Self {
            paths: AppPaths::with_cache_root(cache_root),
            platform,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.paths.cache_root
    }

    #[must_use]
    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    #[must_use]
    pub fn version_dir(&self, version: &NodeVersion) -> PathBuf {
        self.root().join(version.to_string())
    }

    #[must_use]
    pub fn lock_file(&self, version: &NodeVersion) -> PathBuf {
        self.paths.locks_dir().join(format!("{version}.lock"))
    }

    fn entry(&self, version: NodeVersion, path: PathBuf) -> Option<InstalledVersion> {
        if !self.platform.entry_point(&path).is_file() {
            return None;
        }
        Some(InstalledVersion {
            bin_dir: self.platform.bin_dir(&path),
            version,
            path,
        })
    }

    /// Installed runtimes, newest version first.
    ///
    /// # Errors
    /// Returns an error if the cache root exists but cannot be read.
    pub fn list(&self) -> Result<Vec<InstalledVersion>, StoreError> {
        let root = self.root();
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(StoreError::io("failed to read cache root", root, error)),
        };

        let mut installed = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|error| StoreError::io("failed to read cache root", root, error))?;
            let Some(version) = managed_version(&entry.file_name().to_string_lossy()) else {
                continue;
            };
            let path = entry.path();
            match self.entry(version, path) {
                Some(found) => installed.push(found),
                None => debug!("ignoring incomplete runtime at {}", entry.path().display()),
            }
        }

        installed.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(installed)
    }

    #[must_use]
    pub fn lookup(&self, version: &NodeVersion) -> Option<InstalledVersion> {
        self.entry(version.clone(), self.version_dir(version))
    }

    /// Delete a runtime directory, complete or not.
    ///
    /// # Errors
    /// Returns [`StoreError::NotInstalled`] when no directory exists for
    /// `version`, or an I/O error if deletion fails.
    pub fn remove(&self, version: &NodeVersion) -> Result<(), StoreError> {
        let dir = self.version_dir(version);
        if fs::symlink_metadata(&dir).is_err() {
            return Err(StoreError::NotInstalled {
                version: version.clone(),
            });
        }

        fs::remove_dir_all(&dir)
            .map_err(|error| StoreError::io("failed to remove runtime", &dir, error))?;
        debug!("removed {}", dir.display());
        Ok(())
    }

    /// Delete every managed entry under the cache root: runtime directories,
    /// scratch space, lock files and the recency record. Returns how many
    /// runtime directories were removed.
    ///
    /// # Errors
    /// Returns an error if the cache root cannot be read or an entry cannot be
    /// removed.
    pub fn clean(&self) -> Result<usize, StoreError> {
        let root = self.root();
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(error) => return Err(StoreError::io("failed to read cache root", root, error)),
        };

        let mut removed = 0;
        for entry in entries {
            let entry =
                entry.map_err(|error| StoreError::io("failed to read cache root", root, error))?;
            let path = entry.path();
            if managed_version(&entry.file_name().to_string_lossy()).is_some() && path.is_dir() {
                fs::remove_dir_all(&path)
                    .map_err(|error| StoreError::io("failed to remove runtime", &path, error))?;
                removed += 1;
            }
        }

        for dir in [self.paths.staging_dir(), self.paths.locks_dir()] {
            if dir.is_dir() {
                fs::remove_dir_all(&dir)
                    .map_err(|error| StoreError::io("failed to remove directory", &dir, error))?;
            }
        }

        let last_used = self.paths.last_used_file();
        if last_used.is_file() {
            fs::remove_file(&last_used)
                .map_err(|error| StoreError::io("failed to remove file", &last_used, error))?;
        }

        Ok(removed)
    }

    /// Record `version` as the most recently used runtime.
    ///
    /// # Errors
    /// Returns an error if the record cannot be written.
    pub fn mark_used(&self, version: &NodeVersion) -> Result<(), StoreError> {
        let path = self.paths.last_used_file();
        fs::create_dir_all(self.root())
            .map_err(|error| StoreError::io("failed to create cache root", self.root(), error))?;
        fs::write(&path, format!("{version}\n"))
            .map_err(|error| StoreError::io("failed to record last used version", &path, error))
    }

    fn last_used(&self) -> Option<NodeVersion> {
        let path = self.paths.last_used_file();
        let contents = fs::read_to_string(&path).ok()?;
        match contents.trim().parse() {
            Ok(version) => Some(version),
            Err(error) => {
                warn!("ignoring unreadable {}: {error}", path.display());
                None
            }
        }
    }

    /// Installed runtimes ordered by recency: the recorded last-used version
    /// first, then the rest by directory modification time.
    ///
    /// # Errors
    /// Returns an error if the cache root cannot be listed.
    pub fn by_recency(&self) -> Result<Vec<InstalledVersion>, StoreError> {
        let mut installed = self.list()?;
        let last_used = self.last_used();

        installed.sort_by_key(|entry| {
            let is_last_used = last_used.as_ref() == Some(&entry.version);
            let modified = fs::metadata(&entry.path)
                .and_then(|metadata| metadata.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (Reverse(is_last_used), Reverse(modified))
        });

        Ok(installed)
    }
}

/// Parse a cache-root entry name into the version it holds. Only canonical
/// names (`v14.21.3`) are managed.
fn managed_version(name: &str) -> Option<NodeVersion> {
    let version: NodeVersion = name.parse().ok()?;
    (version.to_string() == name).then_some(version)
}

#[cfg(test)]
mod tests {
    use nodapt_platform::{Arch, Os};

    use super::*;

    fn store(root: &Path) -> VersionStore {
        VersionStore::new(root.to_path_buf(), Platform::new(Os::Linux, Arch::X64))
    }

    fn install_fake(store: &VersionStore, version: &str) -> NodeVersion {
        let version: NodeVersion = version.parse().expect("valid version in test");
        let bin = store.version_dir(&version).join("bin");
        fs::create_dir_all(&bin).expect("create bin dir");
        fs::write(bin.join("node"), "#!/bin/sh\n").expect("write entry point");
        version
    }

    #[test]
    fn list_returns_complete_entries_newest_first() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let store = store(temp_dir.path());
        install_fake(&store, "14.17.0");
        install_fake(&store, "16.20.2");

        let listed: Vec<String> = store
            .list()
            .expect("list succeeds")
            .into_iter()
            .map(|entry| entry.version.to_string())
            .collect();

        assert_eq!(listed, ["v16.20.2", "v14.17.0"]);
    }

    #[test]
    fn list_hides_incomplete_and_unmanaged_directories() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let store = store(temp_dir.path());
        install_fake(&store, "18.19.0");
        fs::create_dir_all(temp_dir.path().join("v20.11.0").join("lib")).unwrap();
        fs::create_dir_all(temp_dir.path().join(".staging").join("v20.11.0-abc")).unwrap();
        fs::create_dir_all(temp_dir.path().join("20.11.0").join("bin")).unwrap();
        fs::write(temp_dir.path().join("20.11.0/bin/node"), "").unwrap();

        let listed = store.list().expect("list succeeds");

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].version.to_string(), "v18.19.0");
    }

    #[test]
    fn list_on_missing_root_is_empty() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let store = store(&temp_dir.path().join("does-not-exist"));
        assert!(store.list().expect("list succeeds").is_empty());
    }

    #[test]
    fn lookup_reports_paths() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let store = store(temp_dir.path());
        let version = install_fake(&store, "14.21.3");

        let entry = store.lookup(&version).expect("installed");
        assert_eq!(entry.path, temp_dir.path().join("v14.21.3"));
        assert_eq!(entry.bin_dir, temp_dir.path().join("v14.21.3").join("bin"));

        assert!(store.lookup(&NodeVersion::new(14, 21, 2)).is_none());
    }

    #[test]
    fn remove_deletes_installed_version() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let store = store(temp_dir.path());
        let version = install_fake(&store, "14.21.3");
        install_fake(&store, "16.0.0");

        store.remove(&version).expect("remove succeeds");

        let listed = store.list().expect("list succeeds");
        assert!(listed.iter().all(|entry| entry.version != version));
        assert_eq!(listed.len(), 1);
    }

    #[test]
    fn remove_absent_version_is_not_installed() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let store = store(temp_dir.path());

        let error = store.remove(&NodeVersion::new(14, 21, 3)).unwrap_err();
        assert!(matches!(
            error,
            StoreError::NotInstalled { ref version } if version.to_string() == "v14.21.3"
        ));
    }

    #[test]
    fn remove_handles_orphaned_directory() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let store = store(temp_dir.path());
        let orphan = temp_dir.path().join("v20.0.0").join("lib");
        fs::create_dir_all(&orphan).unwrap();

        store
            .remove(&NodeVersion::new(20, 0, 0))
            .expect("orphan removal succeeds");
        assert!(!temp_dir.path().join("v20.0.0").exists());
    }

    #[test]
    fn clean_only_touches_managed_entries() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let store = store(temp_dir.path());
        install_fake(&store, "14.21.3");
        install_fake(&store, "16.20.2");
        fs::create_dir_all(store.paths().staging_dir().join("partial")).unwrap();
        fs::create_dir_all(temp_dir.path().join("notes")).unwrap();
        fs::write(temp_dir.path().join("README"), "keep").unwrap();
        store.mark_used(&NodeVersion::new(14, 21, 3)).unwrap();

        let removed = store.clean().expect("clean succeeds");

        assert_eq!(removed, 2);
        assert!(store.list().unwrap().is_empty());
        assert!(!store.paths().staging_dir().exists());
        assert!(!store.paths().last_used_file().exists());
        assert!(temp_dir.path().join("notes").is_dir());
        assert!(temp_dir.path().join("README").is_file());
    }

    #[test]
    fn by_recency_prefers_last_used_record() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let store = store(temp_dir.path());
        let older = install_fake(&store, "14.21.3");
        install_fake(&store, "20.11.0");

        store.mark_used(&older).expect("record usage");

        let ordered = store.by_recency().expect("ordering succeeds");
        assert_eq!(ordered[0].version, older);
        assert_eq!(ordered.len(), 2);
    }

    #[test]
    fn by_recency_ignores_stale_record() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let store = store(temp_dir.path());
        let only = install_fake(&store, "18.19.0");
        store.mark_used(&NodeVersion::new(12, 0, 0)).unwrap();

        let ordered = store.by_recency().expect("ordering succeeds");
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].version, only);
    }
}
