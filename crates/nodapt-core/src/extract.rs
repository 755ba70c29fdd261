use std::fs;
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use log::debug;
use thiserror::Error;

use nodapt_platform::Platform;

const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarXz,
    TarGz,
    Zip,
}

impl ArchiveFormat {
    /// The format upstream publishes for `platform`.
    #[must_use]
    pub fn for_platform(platform: &Platform) -> Self {
        if platform.is_windows() {
            Self::Zip
        } else {
            Self::TarXz
        }
    }

    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        if name.ends_with(".tar.xz") {
            Some(Self::TarXz)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{context} {}: {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{context}: {source}")]
    Zip {
        context: &'static str,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("unsupported entry type {kind} for {entry}")]
    UnsupportedEntryType { entry: String, kind: String },
    #[error("link {entry} points at {} which has not been extracted", target.display())]
    DanglingLink { entry: String, target: PathBuf },
    #[error("entry {entry} escapes the destination directory")]
    UnsafePath { entry: String },
}

impl ExtractError {
    fn io(context: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }

    fn zip(context: &'static str, source: zip::result::ZipError) -> Self {
        Self::Zip { context, source }
    }
}

/// Unpack `archive` into `dest`, which is created if needed.
///
/// Entries are applied in archive order, so hard links must come after the
/// files they point at. Nothing is cleaned up on failure.
///
/// # Errors
/// Returns an error for unreadable or corrupt archives, entries escaping
/// `dest`, unsupported entry kinds and dangling hard links.
pub fn extract(archive: &Path, format: ArchiveFormat, dest: &Path) -> Result<(), ExtractError> {
    fs::create_dir_all(dest)
        .map_err(|error| ExtractError::io("failed to create destination", dest, error))?;
    let file = fs::File::open(archive)
        .map_err(|error| ExtractError::io("failed to open archive", archive, error))?;
    let reader = BufReader::new(file);

    match format {
        ArchiveFormat::TarXz => extract_tar(xz2::read::XzDecoder::new(reader), archive, dest)?,
        ArchiveFormat::TarGz => extract_tar(flate2::read::GzDecoder::new(reader), archive, dest)?,
        ArchiveFormat::Zip => extract_zip(reader, dest)?,
    }

    debug!("Extraction complete to {}", dest.display());
    Ok(())
}

/// Join `entry` onto `dest`. Rejects components that climb out lexically and
/// entries routed through a symlink that an earlier entry placed under `dest`.
fn safe_join(dest: &Path, entry: &Path) -> Result<PathBuf, ExtractError> {
    let unsafe_path = || ExtractError::UnsafePath {
        entry: entry.display().to_string(),
    };

    let mut parts = Vec::new();
    for component in entry.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_path());
            }
        }
    }

    let mut joined = dest.to_path_buf();
    for (index, part) in parts.iter().enumerate() {
        joined.push(part);
        let is_parent = index + 1 < parts.len();
        if is_parent
            && fs::symlink_metadata(&joined).is_ok_and(|meta| meta.file_type().is_symlink())
        {
            return Err(unsafe_path());
        }
    }
    Ok(joined)
}

/// Remove whatever non-directory sits at `path` so the next write creates a
/// fresh entry instead of following it.
fn clear_non_directory(path: &Path) -> Result<(), ExtractError> {
    match fs::symlink_metadata(path) {
        Ok(meta) if !meta.is_dir() => fs::remove_file(path)
            .map_err(|error| ExtractError::io("failed to replace", path, error)),
        _ => Ok(()),
    }
}

fn create_parent(path: &Path) -> Result<(), ExtractError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|error| ExtractError::io("failed to create directory", parent, error))?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), ExtractError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
        .map_err(|error| ExtractError::io("failed to set permissions on", path, error))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), ExtractError> {
    Ok(())
}

fn write_file(reader: &mut impl Read, path: &Path, mode: Option<u32>) -> Result<(), ExtractError> {
    create_parent(path)?;
    clear_non_directory(path)?;
    let mut out = fs::File::create(path)
        .map_err(|error| ExtractError::io("failed to create file", path, error))?;
    io::copy(reader, &mut out)
        .map_err(|error| ExtractError::io("failed to write file", path, error))?;
    if let Some(mode) = mode {
        set_mode(path, mode)?;
    }
    Ok(())
}

fn make_symlink(target: &Path, path: &Path) -> Result<(), ExtractError> {
    create_parent(path)?;
    clear_non_directory(path)?;
    #[cfg(unix)]
    let result = std::os::unix::fs::symlink(target, path);
    #[cfg(windows)]
    let result = std::os::windows::fs::symlink_file(target, path);
    result.map_err(|error| ExtractError::io("failed to create symlink", path, error))
}

fn extract_tar(reader: impl Read, archive_path: &Path, dest: &Path) -> Result<(), ExtractError> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(|error| ExtractError::io("failed to read archive", archive_path, error))?;

    for entry in entries {
        let mut entry =
            entry.map_err(|error| ExtractError::io("failed to read archive", archive_path, error))?;
        let entry_path = entry
            .path()
            .map_err(|error| ExtractError::io("failed to read entry name in", archive_path, error))?
            .into_owned();
        let entry_type = entry.header().entry_type();

        if entry_type.is_pax_global_extensions() {
            continue;
        }

        let out_path = safe_join(dest, &entry_path)?;
        let mode = entry.header().mode().ok();

        if entry_type.is_dir() {
            clear_non_directory(&out_path)?;
            fs::create_dir_all(&out_path)
                .map_err(|error| ExtractError::io("failed to create directory", &out_path, error))?;
            if let Some(mode) = mode {
                set_mode(&out_path, mode)?;
            }
        } else if entry_type.is_file() || entry_type.is_contiguous() {
            write_file(&mut entry, &out_path, mode)?;
        } else if entry_type.is_symlink() || entry_type.is_hard_link() {
            let link_name = entry
                .link_name()
                .map_err(|error| {
                    ExtractError::io("failed to read link target in", archive_path, error)
                })?
                .ok_or_else(|| ExtractError::UnsupportedEntryType {
                    entry: entry_path.display().to_string(),
                    kind: "link without target".to_string(),
                })?
                .into_owned();

            if entry_type.is_symlink() {
                make_symlink(&link_name, &out_path)?;
            } else {
                let target = safe_join(dest, &link_name)?;
                if fs::symlink_metadata(&target).is_err() {
                    return Err(ExtractError::DanglingLink {
                        entry: entry_path.display().to_string(),
                        target,
                    });
                }
                create_parent(&out_path)?;
                clear_non_directory(&out_path)?;
                fs::hard_link(&target, &out_path).map_err(|error| {
                    ExtractError::io("failed to create hard link", &out_path, error)
                })?;
            }
        } else {
            return Err(ExtractError::UnsupportedEntryType {
                entry: entry_path.display().to_string(),
                kind: format!("{entry_type:?}"),
            });
        }
    }

    Ok(())
}

fn extract_zip<R>(reader: R, dest: &Path) -> Result<(), ExtractError>
where
    R: Read + io::Seek,
{
    let mut archive = zip::ZipArchive::new(reader)
        .map_err(|error| ExtractError::zip("failed to read zip archive", error))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|error| ExtractError::zip("failed to read zip entry", error))?;
        let Some(name) = entry.enclosed_name() else {
            return Err(ExtractError::UnsafePath {
                entry: entry.name().to_string(),
            });
        };
        let out_path = safe_join(dest, &name)?;
        let mode = entry.unix_mode();

        if entry.is_dir() {
            clear_non_directory(&out_path)?;
            fs::create_dir_all(&out_path)
                .map_err(|error| ExtractError::io("failed to create directory", &out_path, error))?;
        } else if mode.is_some_and(|mode| mode & S_IFMT == S_IFLNK) {
            let mut target = String::new();
            entry
                .read_to_string(&mut target)
                .map_err(|error| {
                    ExtractError::io("failed to read link target for", &out_path, error)
                })?;
            make_symlink(Path::new(&target), &out_path)?;
        } else {
            write_file(&mut entry, &out_path, mode)?;
        }
    }

    Ok(())
}
