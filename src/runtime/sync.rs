//! Startup barrier between the launcher and the sandbox process

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::OwnedFd;

use log::debug;
use nix::unistd::pipe;
use thiserror::Error;

/// Byte the launcher sends once identity mapping has finished
const RELEASE_BYTE: u8 = 1;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to create release pipe: {0}")]
    CreateFailed(nix::Error),

    #[error("Launcher went away before releasing the sandbox")]
    LauncherGone,

    #[error("Failed waiting for release: {0}")]
    WaitFailed(io::Error),

    #[error("Failed to release the sandbox: {0}")]
    ReleaseFailed(io::Error),

    #[error("Release pipe already spent")]
    Spent,
}

/// One-shot, one-directional release gate built on a pipe.
///
/// Both processes inherit both pipe ends from the clone; each side first
/// drops the end it does not own. The sandbox process blocks reading one
/// byte, which the launcher writes only after the identity maps are in
/// place. End-of-file *without* that byte means the launcher died
/// mid-setup, and the sandbox must exit instead of running the target
/// program with an incomplete identity.
pub struct StartBarrier {
    rx: Option<OwnedFd>,
    tx: Option<OwnedFd>,
}

impl StartBarrier {
    pub fn new() -> Result<Self, SyncError> {
        let (rx, tx) = pipe().map_err(SyncError::CreateFailed)?;
        Ok(Self {
            rx: Some(rx),
            tx: Some(tx),
        })
    }

    /// Launcher side: the launcher only ever writes, so its copy of the
    /// read end goes away as soon as the sandbox process exists.
    pub fn close_read_end(&mut self) {
        self.rx.take();
    }

    /// Launcher side: send the release byte, then close the write end.
    pub fn release(&mut self) -> Result<(), SyncError> {
        let tx = self.tx.take().ok_or(SyncError::Spent)?;
        let mut tx = File::from(tx);
        tx.write_all(&[RELEASE_BYTE])
            .map_err(SyncError::ReleaseFailed)?;
        debug!("sandbox released");
        Ok(())
    }

    /// Sandbox side: drop our copy of the write end (or end-of-file could
    /// never reach us), then block until the launcher releases us.
    pub fn wait_for_release(&mut self) -> Result<(), SyncError> {
        self.tx.take();
        let rx = self.rx.take().ok_or(SyncError::Spent)?;
        let mut rx = File::from(rx);
        let mut release = [0u8; 1];
        match rx.read_exact(&mut release) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Err(SyncError::LauncherGone),
            Err(err) => Err(SyncError::WaitFailed(err)),
        }
    }
}
