//! Private per-sandbox `/tmp`, backed by `overlay/tmp/<remainder>` (spec §4.5
//! "Tmp").

use std::fs::{self, OpenOptions};
use std::path::Path;

use crate::errno::SysErr;
use crate::fd::FileHandle;

use super::OpenFlags;

/// Opens `overlay_path` with the guest's full requested flag set.
pub fn open(overlay_path: &Path, flags: OpenFlags) -> Result<FileHandle, SysErr> {
    if flags.create {
        if let Some(parent) = overlay_path.parent() {
            fs::create_dir_all(parent).map_err(to_sys_err)?;
        }
    }

    let mut opts = OpenOptions::new();
    opts.read(true).write(flags.write_requested).create(flags.create);
    if flags.truncate {
        opts.truncate(true);
    }
    let file = opts.open(overlay_path).map_err(to_sys_err)?;
    Ok(FileHandle::Tmp(file))
}

fn to_sys_err(e: std::io::Error) -> SysErr {
    SysErr::from_host_io_error(nix::errno::Errno::from_raw(
        e.raw_os_error().unwrap_or(libc::EIO),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn create_then_write_then_reopen_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foo");

        let create_flags = OpenFlags { write_requested: true, create: true, truncate: false };
        let mut handle = open(&path, create_flags).unwrap();
        assert_eq!(handle.write(b"hello").unwrap(), 5);
        drop(handle);

        let read_flags = OpenFlags { write_requested: false, create: false, truncate: false };
        let mut handle = open(&path, read_flags).unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(handle.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn opening_without_create_on_missing_path_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing");
        let flags = OpenFlags { write_requested: false, create: false, truncate: false };
        assert!(open(&path, flags).is_err());
    }

    #[test]
    fn create_makes_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c");
        let flags = OpenFlags { write_requested: true, create: true, truncate: false };
        assert!(open(&path, flags).is_ok());
        assert!(path.parent().unwrap().is_dir());
    }
}
