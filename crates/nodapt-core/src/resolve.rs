//! Constraint resolution over a candidate set.
//!
//! Resolution is a pure selection: callers decide whether the candidates come
//! from the mirror index or the local store.

use thiserror::Error;

use nodapt_backend::{ConstraintError, NodeVersion, VersionConstraint};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no version matching {constraint} found")]
    NotFound { constraint: String },
    #[error(transparent)]
    MalformedConstraint(#[from] ConstraintError),
}

/// Select the version `constraint` designates among `candidates`.
///
/// Exact constraints only accept an equal candidate, ranges take the highest
/// satisfying candidate, and the installed sentinel takes the first candidate
/// (callers pass the store's recency-ordered list).
///
/// # Errors
/// Returns [`ResolveError::NotFound`] when no candidate qualifies.
pub fn resolve<'a, I>(
    constraint: &VersionConstraint,
    candidates: I,
) -> Result<NodeVersion, ResolveError>
where
    I: IntoIterator<Item = &'a NodeVersion>,
{
    let mut candidates = candidates.into_iter();
    let selected = match constraint {
        VersionConstraint::Exact(expected) => candidates.find(|candidate| *candidate == expected),
        VersionConstraint::Range { .. } => candidates
            .filter(|candidate| constraint.matches(candidate))
            .max(),
        VersionConstraint::Installed => candidates.next(),
    };

    selected.cloned().ok_or_else(|| ResolveError::NotFound {
        constraint: constraint.to_string(),
    })
}

/// Parse `input` and resolve it against `candidates`.
///
/// # Errors
/// Returns [`ResolveError::MalformedConstraint`] for invalid input and
/// [`ResolveError::NotFound`] when nothing matches.
pub fn resolve_str<'a, I>(input: &str, candidates: I) -> Result<NodeVersion, ResolveError>
where
    I: IntoIterator<Item = &'a NodeVersion>,
{
    let constraint: VersionConstraint = input.parse()?;
    resolve(&constraint, candidates)
}
