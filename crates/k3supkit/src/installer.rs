//! Installer binary resolution.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Resolve the installer and check that it can be executed.
///
/// A bare program name (no directory component) is looked up in `PATH`.
/// Anything else must point at an existing regular file; on Unix at least
/// one execute bit must be set.
///
/// Returns the resolved path.
pub fn ensure_executable(path: &Path) -> Result<PathBuf> {
    if is_bare_name(path) {
        return which::which(path).map_err(|e| {
            log::debug!("{} not found in PATH: {}", path.display(), e);
            Error::InstallerNotFound(path.to_path_buf())
        });
    }

    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            log::debug!("Cannot stat {}: {}", path.display(), e);
            return Err(Error::InstallerNotFound(path.to_path_buf()));
        }
    };

    if !metadata.is_file() || !has_execute_bit(&metadata) {
        return Err(Error::InstallerNotExecutable(path.to_path_buf()));
    }

    Ok(path.to_path_buf())
}

fn is_bare_name(path: &Path) -> bool {
    path.parent().is_some_and(|parent| parent.as_os_str().is_empty())
        && path.components().count() == 1
        && !path.has_root()
}

#[cfg(unix)]
fn has_execute_bit(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn has_execute_bit(_metadata: &fs::Metadata) -> bool {
    true
}
