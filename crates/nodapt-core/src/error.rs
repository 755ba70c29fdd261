use thiserror::Error;

use nodapt_backend::ConstraintError;

use crate::acquire::AcquireError;
use crate::index::IndexError;
use crate::launch::LaunchError;
use crate::manifest::ManifestError;
use crate::resolve::ResolveError;
use crate::store::StoreError;

/// Any failure surfaced by [`crate::Manager`].
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Constraint(#[from] ConstraintError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Acquire(#[from] AcquireError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}
