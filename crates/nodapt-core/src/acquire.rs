use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use thiserror::Error;

use nodapt_backend::{InstalledVersion, NodeVersion, Transport, TransportError};

use crate::extract::{ArchiveFormat, ExtractError, extract};
use crate::index::mirror_url;
use crate::store::VersionStore;

const CHECKSUMS_FILE: &str = "SHASUMS256.txt";
const EXTRACT_DIR: &str = "out";

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("no build published at {url}")]
    NoBuild { url: String },
    #[error("no checksum entry for {archive} in {url}")]
    ChecksumMissing { archive: String, url: String },
    #[error("checksum mismatch for {archive}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        archive: String,
        expected: String,
        actual: String,
    },
    #[error("failed to hash {}: {source}", path.display())]
    Hash {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("failed to download {version}: {source}")]
    Download {
        version: NodeVersion,
        #[source]
        source: DownloadError,
    },
    #[error("failed to extract {version}: {source}")]
    Extraction {
        version: NodeVersion,
        #[source]
        source: ExtractError,
    },
    #[error("archive for {version} has no runtime entry point at {}", path.display())]
    Incomplete { version: NodeVersion, path: PathBuf },
    #[error("failed to publish {version} to {}: {source}", path.display())]
    Publish {
        version: NodeVersion,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to lock {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare staging area {}: {source}", path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl AcquireError {
    fn download(version: &NodeVersion, source: impl Into<DownloadError>) -> Self {
        Self::Download {
            version: version.clone(),
            source: source.into(),
        }
    }

    fn extraction(version: &NodeVersion, source: ExtractError) -> Self {
        Self::Extraction {
            version: version.clone(),
            source,
        }
    }

    fn publish(version: &NodeVersion, path: &Path, source: io::Error) -> Self {
        Self::Publish {
            version: version.clone(),
            path: path.to_path_buf(),
            source,
        }
    }

    fn staging(path: &Path, source: io::Error) -> Self {
        Self::Staging {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Exclusive advisory lock on a per-version lock file, released on drop.
struct InstallLock {
    file: fs::File,
}

impl InstallLock {
    fn acquire(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;

        if fs2::FileExt::try_lock_exclusive(&file).is_err() {
            info!("Waiting for another process to finish installing into {}", path.display());
            fs2::FileExt::lock_exclusive(&file)?;
        }

        Ok(Self { file })
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(error) = fs2::FileExt::unlock(&self.file) {
            debug!("failed to release install lock: {error}");
        }
    }
}

/// Downloads, verifies, extracts and publishes runtimes into a
/// [`VersionStore`].
///
/// Publication is a single directory rename out of the store's staging area,
/// so an interrupted install never leaves a listed version behind.
pub struct Installer<'a> {
    store: &'a VersionStore,
    transport: &'a dyn Transport,
    mirror: &'a str,
}

impl<'a> Installer<'a> {
    #[must_use]
    pub fn new(store: &'a VersionStore, transport: &'a dyn Transport, mirror: &'a str) -> Self {
        Self {
            store,
            transport,
            mirror,
        }
    }

    /// Upstream archive name, e.g. `node-v14.21.3-linux-x64.tar.xz`.
    #[must_use]
    pub fn archive_name(&self, version: &NodeVersion) -> String {
        let platform = self.store.platform();
        format!(
            "node-{version}-{}.{}",
            platform.dist_suffix(),
            platform.archive_extension()
        )
    }

    #[must_use]
    pub fn download_url(&self, version: &NodeVersion) -> String {
        mirror_url(
            self.mirror,
            &format!("{version}/{}", self.archive_name(version)),
        )
    }

    #[must_use]
    pub fn checksums_url(&self, version: &NodeVersion) -> String {
        mirror_url(self.mirror, &format!("{version}/{CHECKSUMS_FILE}"))
    }

    /// Make sure `version` is installed, acquiring it when it is not.
    ///
    /// An installed version returns immediately without any network traffic.
    /// Concurrent callers for the same version are serialized through the
    /// store's lock directory.
    ///
    /// # Errors
    /// Returns an [`AcquireError`] naming the stage that failed.
    pub async fn ensure(&self, version: &NodeVersion) -> Result<InstalledVersion, AcquireError> {
        if let Some(installed) = self.store.lookup(version) {
            debug!("{version} already installed at {}", installed.path.display());
            return Ok(installed);
        }

        let _lock = self.lock(version).await?;

        if let Some(installed) = self.store.lookup(version) {
            debug!("{version} was installed by another process");
            return Ok(installed);
        }

        self.acquire(version).await
    }

    async fn lock(&self, version: &NodeVersion) -> Result<InstallLock, AcquireError> {
        let path = self.store.lock_file(version);
        let lock_path = path.clone();
        tokio::task::spawn_blocking(move || InstallLock::acquire(&lock_path))
            .await
            .map_err(io::Error::other)
            .and_then(|result| result)
            .map_err(|source| AcquireError::Lock { path, source })
    }

    async fn acquire(&self, version: &NodeVersion) -> Result<InstalledVersion, AcquireError> {
        let staging_root = self.store.paths().staging_dir();
        self.store
            .paths()
            .ensure_dirs()
            .map_err(|error| AcquireError::staging(&staging_root, error))?;
        let staging = tempfile::Builder::new()
            .prefix(&format!("{version}-"))
            .tempdir_in(&staging_root)
            .map_err(|error| AcquireError::staging(&staging_root, error))?;

        let result = self.install_from(version, staging.path()).await;

        let staging_path = staging.path().to_path_buf();
        if let Err(error) = staging.close() {
            warn!(
                "failed to remove staging directory {}: {error}",
                staging_path.display()
            );
        }

        result
    }

    async fn install_from(
        &self,
        version: &NodeVersion,
        staging: &Path,
    ) -> Result<InstalledVersion, AcquireError> {
        let archive_name = self.archive_name(version);
        let url = self.download_url(version);
        let archive_path = staging.join(&archive_name);

        info!("Downloading {version} from {url}");
        let bytes = self
            .transport
            .download(&url, &archive_path)
            .await
            .map_err(|error| {
                if error.is_not_found() {
                    AcquireError::download(version, DownloadError::NoBuild { url: url.clone() })
                } else {
                    AcquireError::download(version, error)
                }
            })?;
        debug!("Downloaded {bytes} bytes for {version}");

        self.verify(version, &archive_name, &archive_path).await?;

        let format = ArchiveFormat::from_file_name(&archive_name)
            .unwrap_or_else(|| ArchiveFormat::for_platform(&self.store.platform()));
        let out = staging.join(EXTRACT_DIR);
        let extract_out = out.clone();
        let extract_archive = archive_path.clone();
        tokio::task::spawn_blocking(move || extract(&extract_archive, format, &extract_out))
            .await
            .map_err(|error| ExtractError::Io {
                context: "extraction task failed for",
                path: archive_path.clone(),
                source: io::Error::other(error),
            })
            .and_then(|result| result)
            .map_err(|error| AcquireError::extraction(version, error))?;

        let runtime_root = locate_runtime_root(&out);
        let entry_point = self.store.platform().entry_point(&runtime_root);
        if !entry_point.is_file() {
            return Err(AcquireError::Incomplete {
                version: version.clone(),
                path: entry_point,
            });
        }

        self.publish(version, &runtime_root)
    }

    async fn verify(
        &self,
        version: &NodeVersion,
        archive_name: &str,
        archive_path: &Path,
    ) -> Result<(), AcquireError> {
        let url = self.checksums_url(version);
        let checksums = self
            .transport
            .get_text(&url)
            .await
            .map_err(|error| AcquireError::download(version, error))?;

        let expected = parse_expected_checksum(&checksums, archive_name).ok_or_else(|| {
            AcquireError::download(
                version,
                DownloadError::ChecksumMissing {
                    archive: archive_name.to_string(),
                    url: url.clone(),
                },
            )
        })?;

        let hash_path = archive_path.to_path_buf();
        let actual = tokio::task::spawn_blocking(move || sha256_file(&hash_path))
            .await
            .map_err(io::Error::other)
            .and_then(|result| result)
            .map_err(|source| {
                AcquireError::download(
                    version,
                    DownloadError::Hash {
                        path: archive_path.to_path_buf(),
                        source,
                    },
                )
            })?;

        if actual.eq_ignore_ascii_case(&expected) {
            debug!("Checksum verified for {archive_name}");
            Ok(())
        } else {
            Err(AcquireError::download(
                version,
                DownloadError::ChecksumMismatch {
                    archive: archive_name.to_string(),
                    expected,
                    actual,
                },
            ))
        }
    }

    fn publish(
        &self,
        version: &NodeVersion,
        runtime_root: &Path,
    ) -> Result<InstalledVersion, AcquireError> {
        let dest = self.store.version_dir(version);

        if fs::symlink_metadata(&dest).is_ok() {
            if let Some(installed) = self.store.lookup(version) {
                debug!("{version} appeared while installing; keeping the published copy");
                return Ok(installed);
            }
            warn!("Replacing incomplete runtime at {}", dest.display());
            fs::remove_dir_all(&dest)
                .map_err(|error| AcquireError::publish(version, &dest, error))?;
        }

        if let Err(error) = fs::rename(runtime_root, &dest) {
            return self
                .store
                .lookup(version)
                .ok_or_else(|| AcquireError::publish(version, &dest, error));
        }

        info!("Installed {version} to {}", dest.display());
        self.store.lookup(version).ok_or_else(|| AcquireError::Incomplete {
            version: version.clone(),
            path: self.store.platform().entry_point(&dest),
        })
    }
}

/// Upstream archives wrap everything in a single `node-v…` directory; flat
/// archives are used as-is.
fn locate_runtime_root(out: &Path) -> PathBuf {
    let Ok(entries) = fs::read_dir(out) else {
        return out.to_path_buf();
    };
    let entries: Vec<_> = entries.filter_map(Result::ok).collect();

    match entries.as_slice() {
        [single]
            if single.path().is_dir()
                && single.file_name().to_string_lossy().starts_with("node-v") =>
        {
            single.path()
        }
        _ => out.to_path_buf(),
    }
}

fn parse_expected_checksum(checksums: &str, archive_name: &str) -> Option<String> {
    checksums.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let hash = parts.next()?;
        let name = parts
            .next()?
            .trim_start_matches('*')
            .trim_start_matches("./");
        (name == archive_name).then(|| hash.to_ascii_lowercase())
    })
}

fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
