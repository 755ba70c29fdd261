use std::env;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use log::debug;
use thiserror::Error;
use tokio::process::{Child, Command};

use nodapt_backend::InstalledVersion;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("command not found: {command}")]
    NotFound { command: String },
    #[error("permission denied running {command}")]
    PermissionDenied {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("failed while waiting for {command}: {source}")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("cannot add {} to PATH: {source}", path.display())]
    InvalidPath {
        path: PathBuf,
        #[source]
        source: env::JoinPathsError,
    },
}

/// A command to start, optionally with a managed runtime in front of `PATH`.
#[derive(Debug, Clone)]
pub struct RunTarget {
    pub runtime: Option<InstalledVersion>,
    pub command: OsString,
    pub args: Vec<OsString>,
}

impl RunTarget {
    pub fn new<I, S>(
        runtime: Option<InstalledVersion>,
        command: impl Into<OsString>,
        args: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            runtime,
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn display_command(&self) -> String {
        self.command.to_string_lossy().into_owned()
    }
}

/// `PATH` for the child: `bin_dir` first, then the inherited entries.
///
/// # Errors
/// Returns an error if `bin_dir` contains the platform path separator.
pub fn child_path(bin_dir: &Path, inherited: Option<&OsStr>) -> Result<OsString, LaunchError> {
    let mut dirs = vec![bin_dir.to_path_buf()];
    if let Some(inherited) = inherited {
        dirs.extend(env::split_paths(inherited));
    }
    env::join_paths(dirs).map_err(|source| LaunchError::InvalidPath {
        path: bin_dir.to_path_buf(),
        source,
    })
}

/// Map a child's exit status to the code this process should exit with.
/// Termination by signal `n` becomes `128 + n`.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

/// Start the target with inherited stdio, wait for it and return its exit
/// code. Termination signals received meanwhile are passed on to the child.
///
/// # Errors
/// Returns a [`LaunchError`] when the command cannot be found or started, or
/// waiting on it fails. A non-zero exit is not an error.
pub async fn launch(target: &RunTarget) -> Result<i32, LaunchError> {
    let command_name = target.display_command();
    let inherited = env::var_os("PATH");

    let path = match &target.runtime {
        Some(runtime) => Some(child_path(&runtime.bin_dir, inherited.as_deref())?),
        None => None,
    };
    let search_path = path.clone().or(inherited);

    let cwd = env::current_dir().map_err(|source| LaunchError::Spawn {
        command: command_name.clone(),
        source,
    })?;
    let program = locate_program(&target.command, search_path.as_deref(), &cwd)?;
    debug!("Launching {} {:?}", program.display(), target.args);

    let mut command = Command::new(&program);
    command.args(&target.args);
    if let Some(path) = &path {
        command.env("PATH", path);
    }

    let mut child = command.spawn().map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => LaunchError::NotFound {
            command: command_name.clone(),
        },
        io::ErrorKind::PermissionDenied => LaunchError::PermissionDenied {
            command: command_name.clone(),
            source,
        },
        _ => LaunchError::Spawn {
            command: command_name.clone(),
            source,
        },
    })?;

    let status = wait_forwarding_signals(&mut child)
        .await
        .map_err(|source| LaunchError::Wait {
            command: command_name,
            source,
        })?;

    debug!("Child exited with {status}");
    Ok(exit_code(status))
}

/// Find the executable to start. Commands containing a path separator are
/// used as given; bare names are looked up on `search_path`.
fn locate_program(
    command: &OsStr,
    search_path: Option<&OsStr>,
    cwd: &Path,
) -> Result<PathBuf, LaunchError> {
    let command_name = command.to_string_lossy().into_owned();
    if Path::new(command).components().count() > 1 {
        return Ok(PathBuf::from(command));
    }

    match which::which_in(command, search_path, cwd) {
        Ok(program) => Ok(program),
        Err(error) => {
            debug!("lookup of {command_name} failed: {error}");
            let present = search_path
                .into_iter()
                .flat_map(env::split_paths)
                .map(|dir| dir.join(command))
                .find(|candidate| candidate.is_file());
            match present {
                Some(candidate) => Err(LaunchError::PermissionDenied {
                    command: command_name,
                    source: io::Error::new(
                        io::ErrorKind::PermissionDenied,
                        format!("{} is not executable", candidate.display()),
                    ),
                }),
                None => Err(LaunchError::NotFound {
                    command: command_name,
                }),
            }
        }
    }
}

#[cfg(unix)]
async fn wait_forwarding_signals(child: &mut Child) -> io::Result<ExitStatus> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;
    use tokio::signal::unix::{SignalKind, signal};

    let pid = child
        .id()
        .and_then(|id| i32::try_from(id).ok())
        .map(Pid::from_raw);

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;

    loop {
        let forwarded = tokio::select! {
            status = child.wait() => return status,
            _ = interrupt.recv() => Signal::SIGINT,
            _ = terminate.recv() => Signal::SIGTERM,
            _ = hangup.recv() => Signal::SIGHUP,
        };

        if let Some(pid) = pid {
            debug!("Forwarding {forwarded} to child {pid}");
            if let Err(error) = kill(pid, forwarded) {
                debug!("failed to forward {forwarded}: {error}");
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_forwarding_signals(child: &mut Child) -> io::Result<ExitStatus> {
    // The console already delivers Ctrl-C to the child.
    loop {
        tokio::select! {
            status = child.wait() => return status,
            result = tokio::signal::ctrl_c() => {
                if result.is_err() {
                    return child.wait().await;
                }
                debug!("Ignoring Ctrl-C while the child runs");
            }
        }
    }
}
