//! Identity mapping for the sandbox's user namespace

use std::fs;
use std::io;

use log::debug;
use nix::unistd::Pid;
use thiserror::Error;

use crate::idmap::IdMap;

#[derive(Error, Debug)]
pub enum NamespaceError {
    #[error("Failed to write {path}: {source}")]
    MapWriteFailed { path: String, source: io::Error },

    #[error("Failed to deny setgroups for process {pid}: {source}")]
    SetgroupsFailed { pid: Pid, source: io::Error },
}

/// Write the user and group ID maps into `/proc/<pid>/...`.
///
/// Runs in the launcher: the sandbox process owns the new user namespace
/// but only a process outside it holds the credentials these writes are
/// checked against. The kernel rejects a gid_map unless setgroups has
/// been denied first, so that write sits between the two map writes.
pub fn write_id_maps(pid: Pid, uid_map: &IdMap, gid_map: &IdMap) -> Result<(), NamespaceError> {
    if !uid_map.is_empty() {
        write_map_file(format!("/proc/{pid}/uid_map"), uid_map)?;
    }
    deny_setgroups(pid)?;
    if !gid_map.is_empty() {
        write_map_file(format!("/proc/{pid}/gid_map"), gid_map)?;
    }
    Ok(())
}

fn write_map_file(path: String, map: &IdMap) -> Result<(), NamespaceError> {
    debug!("writing {path} ({} entries)", map.len());
    fs::write(&path, map.render()).map_err(|source| NamespaceError::MapWriteFailed { path, source })
}

/// Kernels that predate the setgroups control treat it as denied already,
/// so a missing file is fine; any other failure is not.
fn deny_setgroups(pid: Pid) -> Result<(), NamespaceError> {
    match fs::write(format!("/proc/{pid}/setgroups"), "deny") {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!("no setgroups control for process {pid}, treating as denied");
            Ok(())
        }
        Err(source) => Err(NamespaceError::SetgroupsFailed { pid, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_processes_that_do_not_exist() {
        let mut map = IdMap::new();
        map.append(0, 1000).unwrap();
        // Way above any real PID, so /proc has no such entry.
        let err = write_id_maps(Pid::from_raw(i32::MAX - 1), &map, &IdMap::new()).unwrap_err();
        assert!(matches!(err, NamespaceError::MapWriteFailed { .. }));
    }
}
