use std::ffi::OsString;
use std::io::Write;
use std::path::Path;

use log::debug;

use nodapt_backend::VersionConstraint;
use nodapt_core::{Manager, manifest};

use crate::cli::Command;
use crate::error::AppError;

/// Execute a parsed command, writing listings to `out`, and return the
/// process exit code.
pub async fn execute(
    command: Command,
    manager: &Manager,
    cwd: &Path,
    out: &mut impl Write,
) -> Result<i32, AppError> {
    match command {
        Command::Run { command } | Command::External(command) => {
            run_in_project(manager, cwd, command).await
        }
        Command::Use {
            constraint,
            command,
        } => {
            let constraint: VersionConstraint = constraint.parse()?;
            match split_command(command) {
                Some((program, args)) => {
                    Ok(manager.run(Some(&constraint), program, args).await?)
                }
                None => {
                    let installed = manager.prepare(&constraint).await?;
                    writeln!(out, "{}", installed.path.display()).map_err(AppError::Output)?;
                    Ok(0)
                }
            }
        }
        Command::Rm { constraint } => {
            let constraint: VersionConstraint = constraint.parse()?;
            remove(manager, &constraint, out)?;
            Ok(0)
        }
        Command::Clean => {
            let removed = manager.store().clean()?;
            writeln!(out, "Removed {removed} installed version(s)").map_err(AppError::Output)?;
            Ok(0)
        }
        Command::Ls => {
            for installed in manager.store().list()? {
                writeln!(out, "{}", installed.version).map_err(AppError::Output)?;
            }
            Ok(0)
        }
        Command::LsRemote => {
            for remote in manager.list_remote().await? {
                match remote.lts_codename {
                    Some(codename) => writeln!(out, "{} ({codename})", remote.version),
                    None => writeln!(out, "{}", remote.version),
                }
                .map_err(AppError::Output)?;
            }
            Ok(0)
        }
    }
}

fn split_command(mut command: Vec<OsString>) -> Option<(OsString, Vec<OsString>)> {
    if command.is_empty() {
        return None;
    }
    let program = command.remove(0);
    Some((program, command))
}

async fn run_in_project(
    manager: &Manager,
    cwd: &Path,
    command: Vec<OsString>,
) -> Result<i32, AppError> {
    let Some((program, args)) = split_command(command) else {
        return Ok(0);
    };

    let constraint = match manifest::project_constraint(cwd)? {
        Some(raw) => {
            debug!("Project asks for node {raw}");
            Some(raw.parse::<VersionConstraint>()?)
        }
        None => {
            debug!("No engine constraint; running directly");
            None
        }
    };

    Ok(manager.run(constraint.as_ref(), program, args).await?)
}

fn remove(
    manager: &Manager,
    constraint: &VersionConstraint,
    out: &mut impl Write,
) -> Result<(), AppError> {
    let store = manager.store();
    let version = match constraint {
        VersionConstraint::Exact(version) => version.clone(),
        VersionConstraint::Range { .. } => {
            let installed = store.list()?;
            nodapt_core::resolve(constraint, installed.iter().map(|entry| &entry.version))?
        }
        VersionConstraint::Installed => {
            let installed = store.by_recency()?;
            nodapt_core::resolve(constraint, installed.iter().map(|entry| &entry.version))?
        }
    };

    store.remove(&version)?;
    writeln!(out, "Removed {version}").map_err(AppError::Output)?;
    Ok(())
}
