//! Sandbox invocation orchestration

use std::ffi::CString;
use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::idmap::{IdMap, IdMapEntry, IdMapError};
use crate::runtime::{LaunchError, RootBinding, SandboxConfig, launch};
use crate::storage::{self, StorageError};

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Missing target program (expected `-- PROGRAM [ARGS...]`)")]
    MissingProgram,

    #[error("Missing sandbox root (use --chroot SOURCE_DIR)")]
    MissingRoot,

    #[error("Mapping error: {0}")]
    MappingError(#[from] IdMapError),

    #[error("Invalid program argument: {0}")]
    InvalidArgument(#[from] std::ffi::NulError),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Launch error: {0}")]
    LaunchError(#[from] LaunchError),
}

/// Run one sandbox invocation: validate the configuration, prepare the
/// mount target, launch, and hand back the program's exit status
pub fn run(
    user: &[String],
    group: &[String],
    chroot: Option<&Path>,
    command: &[String],
) -> Result<i32, RunError> {
    let config = build_config(user, group, chroot, command)?;

    // Nothing on the host is touched until the configuration is known good.
    storage::ensure_mount_target(&config.root.target)?;

    debug!(
        "launching {:?} with root {} -> {}",
        config.program,
        config.root.source.display(),
        config.root.target.display()
    );
    Ok(launch(&config)?)
}

/// Turn raw flag values into a validated config, without side effects
fn build_config(
    user: &[String],
    group: &[String],
    chroot: Option<&Path>,
    command: &[String],
) -> Result<SandboxConfig, RunError> {
    let uid_map = parse_map(user)?;
    let gid_map = parse_map(group)?;

    let source = chroot.ok_or(RunError::MissingRoot)?;
    let (program, _) = command.split_first().ok_or(RunError::MissingProgram)?;

    let argv = command
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SandboxConfig {
        program: CString::new(program.as_str())?,
        argv,
        uid_map,
        gid_map,
        root: RootBinding::new(source, &storage::mount_target_dir()),
    })
}

fn parse_map(pairs: &[String]) -> Result<IdMap, RunError> {
    let mut map = IdMap::new();
    for pair in pairs {
        let entry: IdMapEntry = pair.parse()?;
        map.append(entry.inside, entry.outside)?;
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idmap::MAP_CAPACITY;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn missing_program_is_rejected() {
        let err = build_config(&[], &[], Some(Path::new("/srv/rootfs")), &[]).unwrap_err();
        assert!(matches!(err, RunError::MissingProgram));
    }

    #[test]
    fn missing_root_is_rejected() {
        let err = build_config(&[], &[], None, &strings(&["/bin/true"])).unwrap_err();
        assert!(matches!(err, RunError::MissingRoot));
    }

    #[test]
    fn malformed_mapping_is_rejected() {
        let err = build_config(
            &strings(&["root:0"]),
            &[],
            Some(Path::new("/srv/rootfs")),
            &strings(&["/bin/true"]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RunError::MappingError(IdMapError::InvalidMapping(_))
        ));
    }

    #[test]
    fn one_mapping_past_capacity_is_rejected() {
        let pairs: Vec<String> = (0..=MAP_CAPACITY as u32)
            .map(|n| format!("{n}:{n}"))
            .collect();
        let err = build_config(
            &pairs,
            &[],
            Some(Path::new("/srv/rootfs")),
            &strings(&["/bin/true"]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RunError::MappingError(IdMapError::CapacityExceeded)
        ));
    }

    #[test]
    fn argv_leads_with_the_program_path() {
        let config = build_config(
            &strings(&["0:1000"]),
            &strings(&["0:1000"]),
            Some(Path::new("/srv/rootfs")),
            &strings(&["/bin/echo", "hello"]),
        )
        .unwrap();
        assert_eq!(config.program.to_str().unwrap(), "/bin/echo");
        assert_eq!(config.argv.len(), 2);
        assert_eq!(config.argv[0].to_str().unwrap(), "/bin/echo");
        assert_eq!(config.root.source, Path::new("/srv/rootfs"));
        assert_eq!(config.uid_map.render(), "0 1000 1\n");
        assert_eq!(config.gid_map.render(), "0 1000 1\n");
    }

    #[test]
    fn nul_bytes_in_arguments_are_rejected() {
        let err = build_config(
            &[],
            &[],
            Some(Path::new("/srv/rootfs")),
            &strings(&["/bin/true", "a\0b"]),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::InvalidArgument(_)));
    }
}
