use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A concrete Node.js release, ordered by semantic-version precedence.
///
/// Parsing accepts an optional `v` tag prefix; display always includes it,
/// matching the upstream release tags (`v20.11.0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeVersion(semver::Version);

impl NodeVersion {
    #[must_use]
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(semver::Version::new(major, minor, patch))
    }

    #[must_use]
    pub fn as_semver(&self) -> &semver::Version {
        &self.0
    }
}

impl From<semver::Version> for NodeVersion {
    fn from(version: semver::Version) -> Self {
        Self(version)
    }
}

impl fmt::Display for NodeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid version {input:?}: {source}")]
pub struct VersionParseError {
    pub input: String,
    #[source]
    pub source: semver::Error,
}

/// Strip surrounding whitespace and a single `v`/`V` tag prefix.
#[must_use]
pub fn strip_tag(input: &str) -> &str {
    let trimmed = input.trim();
    trimmed
        .strip_prefix(['v', 'V'])
        .unwrap_or(trimmed)
}

impl FromStr for NodeVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        semver::Version::parse(strip_tag(s))
            .map(Self)
            .map_err(|source| VersionParseError {
                input: s.trim().to_string(),
                source,
            })
    }
}

/// A fully extracted runtime visible in the version store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledVersion {
    pub version: NodeVersion,
    pub path: PathBuf,
    pub bin_dir: PathBuf,
}

/// A release published on the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteVersion {
    pub version: NodeVersion,
    pub lts_codename: Option<String>,
    pub date: Option<String>,
    /// Build tags published for this release (`linux-x64`, `win-x64-zip`, ...).
    pub files: Vec<String>,
}

impl RemoteVersion {
    #[must_use]
    pub fn has_build(&self, tag: &str) -> bool {
        self.files.iter().any(|file| file == tag)
    }
}
