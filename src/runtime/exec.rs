//! Final stage of sandbox startup: replacing the process image

use std::ffi::{CStr, CString};

use nix::unistd::execv;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Failed to execute {program}: {source}")]
    ExecFailed { program: String, source: nix::Error },
}

/// Replace the current process image with `program`.
///
/// Returns only on failure. No PATH search happens here: by the time this
/// runs the sandbox is already re-rooted, so the caller must supply a
/// path that resolves inside the new root. `argv[0]` is included in
/// `argv` by the caller.
pub fn exec_program(program: &CStr, argv: &[CString]) -> Result<(), ExecError> {
    execv(program, argv).map_err(|source| ExecError::ExecFailed {
        program: program.to_string_lossy().into_owned(),
        source,
    })?;

    Ok(())
}
