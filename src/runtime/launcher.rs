//! Creates the sandbox process and shepherds it to completion

use std::ffi::CString;

use log::debug;
use nix::sched::{CloneFlags, clone};
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::Pid;
use thiserror::Error;

use super::exec::exec_program;
use super::mount::{RootBinding, enter_root};
use super::namespace::{NamespaceError, write_id_maps};
use super::sync::{StartBarrier, SyncError};
use crate::APP_NAME;
use crate::idmap::IdMap;

/// Stack for the sandbox process's initial execution. It runs mount and
/// pipe code from this crate before exec, not just a syscall stub, so a
/// single page is not enough.
const SANDBOX_STACK_SIZE: usize = 1024 * 1024;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Sync error: {0}")]
    SyncError(#[from] SyncError),

    #[error("Failed to create sandbox process: {0}")]
    SpawnFailed(nix::Error),

    #[error("Identity mapping error: {0}")]
    MappingError(#[from] NamespaceError),

    #[error("Failed waiting for the sandbox process: {0}")]
    WaitFailed(nix::Error),
}

/// Everything one sandbox invocation needs, assembled once from the
/// command line and passed by reference from there on.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Path of the program to execute, resolved inside the new root
    pub program: CString,
    /// Full argument vector, `argv[0]` included
    pub argv: Vec<CString>,
    pub uid_map: IdMap,
    pub gid_map: IdMap,
    pub root: RootBinding,
}

/// Run `config.program` in fresh user, PID, and mount namespaces and
/// return its exit status.
///
/// The sandbox process owns the new user namespace from the moment it
/// exists, so it can set up its own mounts right away; its uid/gid maps,
/// however, can only be written from outside. It therefore parks on the
/// barrier after mount setup, and the launcher releases it only once the
/// maps are in place, so the target program always starts with its mapped
/// identity already active.
pub fn launch(config: &SandboxConfig) -> Result<i32, LaunchError> {
    let mut barrier = StartBarrier::new()?;
    let mut stack = vec![0u8; SANDBOX_STACK_SIZE];
    let flags = CloneFlags::CLONE_NEWUSER | CloneFlags::CLONE_NEWPID | CloneFlags::CLONE_NEWNS;

    // SIGCHLD makes the child waitable like a fork()ed one.
    let child = unsafe {
        clone(
            Box::new(|| sandbox_main(config, &mut barrier)),
            &mut stack,
            flags,
            Some(Signal::SIGCHLD as i32),
        )
    }
    .map_err(LaunchError::SpawnFailed)?;
    debug!("sandbox process {child} created");

    barrier.close_read_end();

    if let Err(err) = write_id_maps(child, &config.uid_map, &config.gid_map) {
        abort_sandbox(child);
        return Err(err.into());
    }
    if let Err(err) = barrier.release() {
        abort_sandbox(child);
        return Err(err.into());
    }

    wait_for_exit(child)
}

/// Entry routine of the sandbox process. On success it never returns:
/// the target program replaces the image. Failures are reported to
/// stderr here, on the sandbox's side of the process boundary, and turn
/// into exit status 1.
fn sandbox_main(config: &SandboxConfig, barrier: &mut StartBarrier) -> isize {
    if let Err(err) = enter_root(&config.root) {
        eprintln!("{APP_NAME}: {err}");
        return 1;
    }
    if let Err(err) = barrier.wait_for_release() {
        eprintln!("{APP_NAME}: {err}");
        return 1;
    }
    // execv returns only on failure.
    if let Err(err) = exec_program(&config.program, &config.argv) {
        eprintln!("{APP_NAME}: {err}");
    }
    1
}

/// A sandbox whose setup can no longer complete must not keep running
/// half-mapped; kill it outright and reap it before reporting.
fn abort_sandbox(child: Pid) {
    let _ = kill(child, Signal::SIGKILL);
    let _ = waitpid(child, None);
}

fn wait_for_exit(child: Pid) -> Result<i32, LaunchError> {
    loop {
        match waitpid(child, None).map_err(LaunchError::WaitFailed)? {
            WaitStatus::Exited(_, status) => return Ok(status),
            WaitStatus::Signaled(_, signal, _) => return Ok(128 + signal as i32),
            status => debug!("sandbox process changed state: {status:?}"),
        }
    }
}
