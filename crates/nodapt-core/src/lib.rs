//! Runtime management for nodapt.
//!
//! This crate holds everything below the command line:
//! - Constraint resolution over local or remote candidates.
//! - The mirror index client and the HTTP transport.
//! - The on-disk version store and the installer that fills it.
//! - Archive extraction for the formats upstream publishes.
//! - Launching commands with a managed runtime on `PATH`.

mod acquire;
mod error;
mod extract;
mod http;
mod index;
mod launch;
mod manager;
pub mod manifest;
mod resolve;
mod store;
#[cfg(test)]
mod testing;

/// Download, verification and atomic publication of runtimes.
pub use acquire::{AcquireError, DownloadError, Installer};
/// Aggregate error returned by [`Manager`].
pub use error::Error;
/// Archive unpacking for `.tar.xz`, `.tar.gz` and `.zip` distributions.
pub use extract::{ArchiveFormat, ExtractError, extract};
/// `reqwest`-backed transport.
pub use http::HttpTransport;
/// Mirror index fetching and parsing.
pub use index::{IndexError, fetch_index, mirror_url, parse_index};
/// Child process launching with exit-code propagation.
pub use launch::{LaunchError, RunTarget, child_path, exit_code, launch};
/// High-level entry point used by the binary.
pub use manager::Manager;
/// Constraint resolution.
pub use resolve::{ResolveError, resolve, resolve_str};
/// Installed runtime registry.
pub use store::{StoreError, VersionStore};
