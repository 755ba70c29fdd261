use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use nodapt_backend::{NodeVersion, Transport, TransportError};
use nodapt_platform::Platform;

pub(crate) const MIRROR: &str = "https://mirror.test/dist/";

/// Build an upstream-shaped `.tar.xz` whose `bin/node` prints `version`.
pub(crate) fn node_archive(version: &NodeVersion, platform: &Platform) -> Vec<u8> {
    let root = format!("node-{version}-{}", platform.dist_suffix());
    let script = format!("#!/bin/sh\necho {version}\n");

    let mut builder = tar::Builder::new(xz2::write::XzEncoder::new(Vec::new(), 6));

    let mut dir = tar::Header::new_gnu();
    dir.set_entry_type(tar::EntryType::Directory);
    dir.set_mode(0o755);
    dir.set_size(0);
    builder
        .append_data(&mut dir, format!("{root}/bin/"), io::empty())
        .expect("directory entry");

    let mut node = tar::Header::new_gnu();
    node.set_entry_type(tar::EntryType::Regular);
    node.set_mode(0o755);
    node.set_size(script.len() as u64);
    builder
        .append_data(&mut node, format!("{root}/bin/node"), script.as_bytes())
        .expect("entry point");

    builder
        .into_inner()
        .expect("tar stream")
        .finish()
        .expect("xz stream")
}

/// In-memory mirror serving an index, archives and checksum files.
pub(crate) struct FakeMirror {
    index: Option<String>,
    files: HashMap<String, Vec<u8>>,
    pub(crate) downloads: AtomicUsize,
    pub(crate) index_requests: AtomicUsize,
}

impl FakeMirror {
    pub(crate) fn new() -> Self {
        Self {
            index: Some("[]".to_string()),
            files: HashMap::new(),
            downloads: AtomicUsize::new(0),
            index_requests: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_index(mut self, versions: &[&str], platform: &Platform) -> Self {
        let entries: Vec<String> = versions
            .iter()
            .map(|version| {
                format!(
                    r#"{{"version":"v{version}","files":["{}"],"lts":false}}"#,
                    platform.index_tag()
                )
            })
            .collect();
        self.index = Some(format!("[{}]", entries.join(",")));
        self
    }

    pub(crate) fn offline_index(mut self) -> Self {
        self.index = None;
        self
    }

    pub(crate) fn with_release(mut self, version: &NodeVersion, platform: &Platform) -> Self {
        let archive_name = format!(
            "node-{version}-{}.{}",
            platform.dist_suffix(),
            platform.archive_extension()
        );
        let archive = node_archive(version, platform);
        let checksums = format!("{:x}  {archive_name}\n", Sha256::digest(&archive));

        self.files
            .insert(format!("{MIRROR}{version}/{archive_name}"), archive);
        self.files.insert(
            format!("{MIRROR}{version}/SHASUMS256.txt"),
            checksums.into_bytes(),
        );
        self
    }

    /// Cut every archive in half, keeping checksums consistent so only
    /// extraction fails.
    pub(crate) fn truncate_archives(mut self) -> Self {
        let archives: Vec<String> = self
            .files
            .keys()
            .filter(|url| url.ends_with(".tar.xz"))
            .cloned()
            .collect();

        for url in archives {
            let Some(bytes) = self.files.get_mut(&url) else {
                continue;
            };
            bytes.truncate(bytes.len() / 2);
            let digest = format!("{:x}", Sha256::digest(bytes.as_slice()));

            let (dir, name) = url.rsplit_once('/').expect("archive url has a directory");
            self.files.insert(
                format!("{dir}/SHASUMS256.txt"),
                format!("{digest}  {name}\n").into_bytes(),
            );
        }
        self
    }

    pub(crate) fn corrupt_checksums(mut self) -> Self {
        for (url, bytes) in &mut self.files {
            if url.ends_with("SHASUMS256.txt") {
                let text = String::from_utf8_lossy(bytes).into_owned();
                let name = text.split_whitespace().nth(1).unwrap_or_default();
                *bytes = format!("{}  {name}\n", "0".repeat(64)).into_bytes();
            }
        }
        self
    }
}

#[async_trait]
impl Transport for FakeMirror {
    async fn get_text(&self, url: &str) -> Result<String, TransportError> {
        if url.ends_with("index.json") {
            self.index_requests.fetch_add(1, Ordering::SeqCst);
            return self
                .index
                .clone()
                .ok_or_else(|| TransportError::request(url, "connection refused"));
        }

        self.files
            .get(url)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .ok_or_else(|| TransportError::Status {
                url: url.to_string(),
                status: 404,
            })
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, TransportError> {
        let bytes = self.files.get(url).ok_or_else(|| TransportError::Status {
            url: url.to_string(),
            status: 404,
        })?;
        self.downloads.fetch_add(1, Ordering::SeqCst);
        tokio::fs::write(dest, bytes)
            .await
            .map_err(|error| TransportError::write(dest, error))?;
        Ok(bytes.len() as u64)
    }
}
