use log::debug;
use serde::Deserialize;
use thiserror::Error;

use nodapt_backend::{NodeVersion, RemoteVersion, Transport, TransportError};
use nodapt_platform::Platform;

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to fetch the version index: {0}")]
    Fetch(#[source] TransportError),
    #[error("failed to parse the version index from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct RawEntry {
    version: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    files: Vec<String>,
    #[serde(default)]
    lts: serde_json::Value,
}

/// Join a path onto the configured mirror base, tolerating a missing or
/// doubled trailing slash.
#[must_use]
pub fn mirror_url(mirror: &str, path: &str) -> String {
    format!(
        "{}/{}",
        mirror.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Fetch the releases published on `mirror` that have a build for `platform`,
/// newest first.
///
/// # Errors
/// Returns [`IndexError::Fetch`] when the request fails and
/// [`IndexError::Parse`] when the body is not a valid index.
pub async fn fetch_index(
    transport: &dyn Transport,
    mirror: &str,
    platform: &Platform,
) -> Result<Vec<RemoteVersion>, IndexError> {
    let url = mirror_url(mirror, INDEX_FILE);
    let body = transport.get_text(&url).await.map_err(IndexError::Fetch)?;
    parse_index(&body, &url, platform)
}

/// Parse an `index.json` body, keeping only releases downloadable on
/// `platform`.
///
/// # Errors
/// Returns [`IndexError::Parse`] when the body is not a JSON array of
/// release entries.
pub fn parse_index(
    body: &str,
    url: &str,
    platform: &Platform,
) -> Result<Vec<RemoteVersion>, IndexError> {
    let entries: Vec<RawEntry> =
        serde_json::from_str(body).map_err(|source| IndexError::Parse {
            url: url.to_string(),
            source,
        })?;

    let tag = platform.index_tag();
    let total = entries.len();

    let mut versions: Vec<RemoteVersion> = entries
        .into_iter()
        .filter_map(|entry| {
            let version = match entry.version.parse::<NodeVersion>() {
                Ok(version) => version,
                Err(error) => {
                    debug!("skipping index entry: {error}");
                    return None;
                }
            };
            Some(RemoteVersion {
                version,
                lts_codename: entry.lts.as_str().map(str::to_string),
                date: entry.date,
                files: entry.files,
            })
        })
        .filter(|remote| remote.has_build(&tag))
        .collect();

    versions.sort_by(|a, b| b.version.cmp(&a.version));

    debug!(
        "index lists {total} releases, {} available for {platform}",
        versions.len()
    );
    Ok(versions)
}
