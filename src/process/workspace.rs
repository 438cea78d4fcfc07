//! Server directory preparation
//!
//! Run before launching: the server refuses to start without an accepted
//! EULA, and a crash can leave world lock files behind.

use std::fs;
use std::path::Path;

use crate::error::{RelayError, Result};

const EULA_FILE: &str = "eula.txt";
const SESSION_LOCK_FILE: &str = "session.lock";
const WORLD_DIR_PREFIX: &str = "world";

/// Create the directory, accept the EULA and clear stale world locks
pub fn prepare(server_dir: &Path) -> Result<()> {
    fs::create_dir_all(server_dir).map_err(|e| {
        RelayError::Workspace(format!("Cannot create {}: {}", server_dir.display(), e))
    })?;

    accept_eula(server_dir)?;

    let removed = delete_world_locks(server_dir)?;
    if removed > 0 {
        tracing::info!("Removed {} stale world lock(s) in {}", removed, server_dir.display());
    }

    Ok(())
}

/// Write `eula.txt` with the accepting statement, replacing any existing file
pub fn accept_eula(server_dir: &Path) -> Result<()> {
    let path = server_dir.join(EULA_FILE);
    fs::write(&path, "eula=true\n")
        .map_err(|e| RelayError::Workspace(format!("Cannot write {}: {}", path.display(), e)))?;

    tracing::debug!("Accepted EULA at {}", path.display());
    Ok(())
}

/// Remove `world*/session.lock` files, returning how many were deleted
pub fn delete_world_locks(server_dir: &Path) -> Result<usize> {
    let mut removed = 0;

    for entry in fs::read_dir(server_dir)? {
        let entry = entry?;
        let dir = entry.path();

        let is_world = entry
            .file_name()
            .to_str()
            .map_or(false, |name| name.starts_with(WORLD_DIR_PREFIX));
        if !is_world || !dir.is_dir() {
            continue;
        }

        let lock = dir.join(SESSION_LOCK_FILE);
        if lock.is_file() {
            fs::remove_file(&lock).map_err(|e| {
                RelayError::Workspace(format!("Cannot remove {}: {}", lock.display(), e))
            })?;
            tracing::debug!("Deleted {}", lock.display());
            removed += 1;
        }
    }

    Ok(removed)
}
