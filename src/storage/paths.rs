//! Directory path management for Nsbox

use std::fs::DirBuilder;
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use nix::unistd::getuid;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create mount target {}: {source}", path.display())]
    CreateFailed { path: PathBuf, source: io::Error },
}

/// Get the per-user mount target directory (/run/user/<uid>/nsbox)
///
/// The sandbox root gets bound onto this path. It persists across
/// invocations and is reused, never cleaned up.
pub fn mount_target_dir() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(|| PathBuf::from(format!("/run/user/{}", getuid())))
        .join(crate::APP_NAME)
}

/// Create the mount target if absent; an existing directory is reused
pub fn ensure_mount_target(target: &Path) -> Result<(), StorageError> {
    DirBuilder::new()
        .recursive(true)
        .mode(0o755)
        .create(target)
        .map_err(|source| StorageError::CreateFailed {
            path: target.to_path_buf(),
            source,
        })
}
