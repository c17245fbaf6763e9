//! Environment checks run before any record is touched.
//!
//! Everything here is fatal: a missing tool or an unwritable directory is not a
//! per-record problem, so it is reported once and the run never starts.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::RunSettings;
use crate::error::TootError;
use crate::workspace::WorkspaceManager;

/// Validates `settings` and returns them with both executables resolved to real paths.
pub fn check(settings: &RunSettings) -> Result<RunSettings, TootError> {
    let toot_t = resolve_executable("TooT-T", &settings.toot_t)?;
    let toot_sc = resolve_executable("TooT-SC", &settings.toot_sc)?;

    if !settings.query.exists() {
        return Err(env_err(format!(
            "Query does not exist at location: {}",
            settings.query.display()
        )));
    }
    if !settings.query.is_file() {
        return Err(env_err(format!(
            "Query file specifies a directory instead of a file: {}",
            settings.query.display()
        )));
    }

    require_dir("Database directory", &settings.db)?;
    require_dir("Output directory", &settings.out)?;
    require_writable("Output directory", &settings.out)?;

    let pipeline_dir = WorkspaceManager::new(&settings.work).pipeline_dir();
    if !pipeline_dir.exists() {
        info!("Creating: {}", pipeline_dir.display());
        fs::create_dir_all(&pipeline_dir).map_err(|e| {
            env_err(format!(
                "There was a problem creating working directories: {} ({e})",
                pipeline_dir.display()
            ))
        })?;
    }
    if !pipeline_dir.is_dir() {
        return Err(env_err(format!(
            "TooT-P work directory specifies a file instead of a directory: {}",
            pipeline_dir.display()
        )));
    }
    require_writable("TooT-P work directory", &pipeline_dir)?;

    Ok(RunSettings {
        toot_t,
        toot_sc,
        ..settings.clone()
    })
}

/// Finds `program` on `PATH` when it is a bare name, then checks it can be executed.
pub fn resolve_executable(tool: &str, program: &Path) -> Result<PathBuf, TootError> {
    let candidate = if program.components().count() > 1 {
        program.to_path_buf()
    } else {
        match find_in_path(program) {
            Some(found) => found,
            None if program.exists() => program.to_path_buf(),
            None => {
                return Err(env_err(format!(
                    "Could not locate a default executable script for {tool} ({})",
                    program.display()
                )));
            }
        }
    };

    if !candidate.is_file() {
        return Err(env_err(format!(
            "Could not find a valid {tool} script located at: {}",
            candidate.display()
        )));
    }
    if !is_executable(&candidate) {
        return Err(env_err(format!(
            "Cannot execute {tool} script located at: {}",
            candidate.display()
        )));
    }
    debug!(tool, path = %candidate.display(), "resolved executable");
    Ok(candidate)
}

fn find_in_path(program: &Path) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file() && is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn require_dir(what: &str, path: &Path) -> Result<(), TootError> {
    if !path.exists() {
        return Err(env_err(format!(
            "{what} does not exist at location: {}",
            path.display()
        )));
    }
    if !path.is_dir() {
        return Err(env_err(format!(
            "{what} specifies a file instead of a directory: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Creates (and drops) a scratch file in `path`, so ownership and ACLs are honoured.
fn require_writable(what: &str, path: &Path) -> Result<(), TootError> {
    match tempfile::Builder::new().prefix(".tootp-").tempfile_in(path) {
        Ok(_probe) => Ok(()),
        Err(e) => Err(env_err(format!(
            "{what} specifies a directory without permission to write: {} ({e})",
            path.display()
        ))),
    }
}

fn env_err(msg: String) -> TootError {
    TootError::Environment(msg)
}
