use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
}

impl Os {
    /// Name used in upstream archive file names (`node-v1.2.3-<os>-<arch>`).
    #[must_use]
    pub fn dist_name(self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::MacOs => "darwin",
            Os::Windows => "win",
        }
    }

    /// Name used in the `files` field of the mirror index.
    #[must_use]
    pub fn index_name(self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::MacOs => "osx",
            Os::Windows => "win",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X64,
    X86,
    Arm64,
    ArmV7l,
    Ppc64le,
    S390x,
}

impl Arch {
    #[must_use]
    pub fn dist_name(self) -> &'static str {
        match self {
            Arch::X64 => "x64",
            Arch::X86 => "x86",
            Arch::Arm64 => "arm64",
            Arch::ArmV7l => "armv7l",
            Arch::Ppc64le => "ppc64le",
            Arch::S390x => "s390x",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported host platform: {os}-{arch}")]
pub struct PlatformError {
    pub os: String,
    pub arch: String,
}

/// The host description used to pick downloadable builds and runtime layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    #[must_use]
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Detect the platform this binary was compiled for.
    ///
    /// # Errors
    /// Returns an error when the OS or architecture has no upstream builds.
    pub fn current() -> Result<Self, PlatformError> {
        // `ARCH` does not distinguish byte order on 64-bit PowerPC.
        let arch = match std::env::consts::ARCH {
            "powerpc64" if cfg!(target_endian = "little") => "powerpc64le",
            arch => arch,
        };
        Self::from_consts(std::env::consts::OS, arch)
    }

    /// Map Rust target names (`std::env::consts`) to a platform. Little-endian
    /// 64-bit PowerPC is spelled `powerpc64le`; big-endian `powerpc64` has no
    /// upstream builds.
    ///
    /// # Errors
    /// Returns an error for targets without upstream builds.
    pub fn from_consts(os: &str, arch: &str) -> Result<Self, PlatformError> {
        let unsupported = || PlatformError {
            os: os.to_string(),
            arch: arch.to_string(),
        };

        let os_kind = match os {
            "linux" => Os::Linux,
            "macos" => Os::MacOs,
            "windows" => Os::Windows,
            _ => return Err(unsupported()),
        };
        let arch_kind = match arch {
            "x86_64" => Arch::X64,
            "x86" => Arch::X86,
            "aarch64" => Arch::Arm64,
            "arm" => Arch::ArmV7l,
            "powerpc64le" => Arch::Ppc64le,
            "s390x" => Arch::S390x,
            _ => return Err(unsupported()),
        };

        Ok(Self::new(os_kind, arch_kind))
    }

    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    /// Build tag advertised in the mirror index for this platform's archive,
    /// for example `linux-x64`, `osx-arm64-tar` or `win-x64-zip`.
    #[must_use]
    pub fn index_tag(&self) -> String {
        let base = format!("{}-{}", self.os.index_name(), self.arch.dist_name());
        match self.os {
            Os::Linux => base,
            Os::MacOs => format!("{base}-tar"),
            Os::Windows => format!("{base}-zip"),
        }
    }

    /// Suffix shared by every archive name for this platform, e.g. `linux-x64`.
    #[must_use]
    pub fn dist_suffix(&self) -> String {
        format!("{}-{}", self.os.dist_name(), self.arch.dist_name())
    }

    #[must_use]
    pub fn archive_extension(&self) -> &'static str {
        if self.is_windows() { "zip" } else { "tar.xz" }
    }

    #[must_use]
    pub fn binary_name(&self) -> &'static str {
        if self.is_windows() { "node.exe" } else { "node" }
    }

    /// Directory holding the runtime executables inside an unpacked
    /// distribution rooted at `root`.
    #[must_use]
    pub fn bin_dir(&self, root: &Path) -> PathBuf {
        if self.is_windows() {
            root.to_path_buf()
        } else {
            root.join("bin")
        }
    }

    #[must_use]
    pub fn entry_point(&self, root: &Path) -> PathBuf {
        self.bin_dir(root).join(self.binary_name())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dist_suffix())
    }
}
