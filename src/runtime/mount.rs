//! Mount setup inside the sandbox's namespaces

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use nix::mount::{MntFlags, MsFlags, mount, umount2};
use nix::unistd::{chdir, pivot_root};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MountError {
    #[error("Mount failed: {0}")]
    MountFailed(String),

    #[error("Pivot root failed: {0}")]
    PivotFailed(String),

    #[error("Failed to create proc mount point: {0}")]
    ProcDirFailed(io::Error),
}

/// The directory tree that becomes the sandbox's root: `source` is bound
/// read-only onto `target`, which must already exist.
#[derive(Debug, Clone)]
pub struct RootBinding {
    pub source: PathBuf,
    pub target: PathBuf,
}

impl RootBinding {
    pub fn new(source: &Path, target: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            target: target.to_path_buf(),
        }
    }
}

/// Rebuild the mount tree around the root binding and enter it.
///
/// Runs only inside the fresh mount and user namespaces, before the
/// barrier wait. Every step is fatal on failure; a sandbox with a
/// half-built mount tree must not reach the target program.
pub fn enter_root(root: &RootBinding) -> Result<(), MountError> {
    chdir("/").map_err(|e| MountError::MountFailed(format!("chdir /: {e}")))?;

    // Sever propagation both ways before touching anything else. Without
    // this, mounts below could leak into the host namespace.
    mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_PRIVATE | MsFlags::MS_REC,
        None::<&str>,
    )
    .map_err(|e| MountError::MountFailed(format!("make root private: {e}")))?;

    debug!(
        "binding {} -> {}",
        root.source.display(),
        root.target.display()
    );
    mount(
        Some(root.source.as_path()),
        root.target.as_path(),
        None::<&str>,
        MsFlags::MS_BIND | MsFlags::MS_REC | MsFlags::MS_PRIVATE | MsFlags::MS_RDONLY,
        None::<&str>,
    )
    .map_err(|e| {
        MountError::MountFailed(format!(
            "bind {} -> {}: {e}",
            root.source.display(),
            root.target.display()
        ))
    })?;

    chdir(root.target.as_path())
        .map_err(|e| MountError::MountFailed(format!("chdir to new root: {e}")))?;

    // Fresh proc so tools inside see only the sandbox's PID namespace.
    // It has to go in before the pivot: once the old root is gone the
    // kernel refuses an unprivileged proc mount unless another fully
    // visible proc instance is still attached.
    match fs::create_dir("proc") {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
        Err(err) => return Err(MountError::ProcDirFailed(err)),
    }
    mount(
        Some("proc"),
        "proc",
        Some("proc"),
        MsFlags::empty(),
        None::<&str>,
    )
    .map_err(|e| MountError::MountFailed(format!("mount proc: {e}")))?;

    // pivot_root(".", ".") stacks the old root on top of the new one at
    // the same mount point; detaching "." then drops the old root for
    // good. No scratch directory needed, which matters on a read-only
    // root.
    pivot_root(".", ".").map_err(|e| MountError::PivotFailed(format!("pivot_root: {e}")))?;
    umount2(".", MntFlags::MNT_DETACH)
        .map_err(|e| MountError::PivotFailed(format!("detach old root: {e}")))?;
    chdir("/").map_err(|e| MountError::PivotFailed(format!("chdir /: {e}")))?;

    // The kernel quietly drops MS_RDONLY while creating a bind mount; it
    // only takes hold on a remount, so enforce it here.
    mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_REMOUNT | MsFlags::MS_BIND | MsFlags::MS_RDONLY,
        None::<&str>,
    )
    .map_err(|e| MountError::MountFailed(format!("remount read-only: {e}")))?;

    Ok(())
}
