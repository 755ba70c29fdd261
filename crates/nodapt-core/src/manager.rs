use std::ffi::OsString;
use std::sync::Arc;

use log::{debug, info, warn};

use nodapt_backend::{
    InstalledVersion, NodeVersion, RemoteVersion, Transport, VersionConstraint,
};

use crate::acquire::Installer;
use crate::error::Error;
use crate::index::{IndexError, fetch_index};
use crate::launch::{RunTarget, launch};
use crate::resolve::{ResolveError, resolve};
use crate::store::VersionStore;

/// Ties the store, the mirror and the launcher together for one invocation.
pub struct Manager {
    store: VersionStore,
    transport: Arc<dyn Transport>,
    mirror: String,
}

impl Manager {
    pub fn new(
        store: VersionStore,
        transport: Arc<dyn Transport>,
        mirror: impl Into<String>,
    ) -> Self {
        Self {
            store,
            transport,
            mirror: mirror.into(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &VersionStore {
        &self.store
    }

    #[must_use]
    pub fn installer(&self) -> Installer<'_> {
        Installer::new(&self.store, self.transport.as_ref(), &self.mirror)
    }

    /// Releases the mirror publishes for this host, newest first.
    ///
    /// # Errors
    /// Returns an error if the index cannot be fetched or parsed.
    pub async fn list_remote(&self) -> Result<Vec<RemoteVersion>, Error> {
        let platform = self.store.platform();
        Ok(fetch_index(self.transport.as_ref(), &self.mirror, &platform).await?)
    }

    /// Pick the concrete version `constraint` designates.
    ///
    /// The installed sentinel only consults the store. An exact version that
    /// is already installed needs no network. Ranges are resolved against the
    /// mirror and fall back to installed versions only when the mirror is
    /// unreachable and a local candidate satisfies the range.
    ///
    /// # Errors
    /// Returns [`Error::Resolve`] when nothing matches and [`Error::Index`]
    /// when the mirror is needed but unavailable.
    pub async fn resolve(&self, constraint: &VersionConstraint) -> Result<NodeVersion, Error> {
        match constraint {
            VersionConstraint::Installed => {
                let installed = self.store.by_recency()?;
                let versions: Vec<&NodeVersion> =
                    installed.iter().map(|entry| &entry.version).collect();
                Ok(resolve(constraint, versions)?)
            }
            VersionConstraint::Exact(version) if self.store.lookup(version).is_some() => {
                debug!("{version} is installed; skipping the mirror");
                Ok(version.clone())
            }
            VersionConstraint::Exact(_) => {
                let remote = self.list_remote().await?;
                Ok(resolve(constraint, remote.iter().map(|entry| &entry.version))?)
            }
            VersionConstraint::Range { .. } => match self.list_remote().await {
                Ok(remote) => Ok(resolve(constraint, remote.iter().map(|entry| &entry.version))?),
                Err(Error::Index(IndexError::Fetch(fetch_error))) => {
                    let installed = self.store.list()?;
                    match resolve(constraint, installed.iter().map(|entry| &entry.version)) {
                        Ok(version) => {
                            warn!("Mirror unreachable ({fetch_error}); using installed {version}");
                            Ok(version)
                        }
                        Err(_) => Err(IndexError::Fetch(fetch_error).into()),
                    }
                }
                Err(error) => Err(error),
            },
        }
    }

    /// Resolve `constraint` and make sure the chosen runtime is installed.
    ///
    /// # Errors
    /// Returns an error if resolution or acquisition fails.
    pub async fn prepare(&self, constraint: &VersionConstraint) -> Result<InstalledVersion, Error> {
        let version = self.resolve(constraint).await?;
        info!("Using {version} for {constraint}");
        let installed = self.installer().ensure(&version).await?;

        if let Err(error) = self.store.mark_used(&version) {
            warn!("{error}");
        }

        Ok(installed)
    }

    /// Run `command` with the runtime selected by `constraint` and return the
    /// child's exit code. With no constraint, or the installed sentinel and an
    /// empty store, the command runs in the ambient environment.
    ///
    /// # Errors
    /// Returns an error if the runtime cannot be prepared or the command
    /// cannot be started.
    pub async fn run(
        &self,
        constraint: Option<&VersionConstraint>,
        command: OsString,
        args: Vec<OsString>,
    ) -> Result<i32, Error> {
        let runtime = match constraint {
            Some(sentinel @ VersionConstraint::Installed) => match self.prepare(sentinel).await {
                Ok(installed) => Some(installed),
                Err(Error::Resolve(ResolveError::NotFound { .. })) => {
                    debug!("Nothing installed; running with the ambient environment");
                    None
                }
                Err(error) => return Err(error),
            },
            Some(constraint) => Some(self.prepare(constraint).await?),
            None => None,
        };

        let target = RunTarget {
            runtime,
            command,
            args,
        };
        Ok(launch(&target).await?)
    }
}
