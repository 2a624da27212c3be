//! Copy-on-write view of a host path (spec §4.5 "Cow").
//!
//! Starts in `Passthrough` mode (a read-only host fd) and transitions to
//! `Writecopy` the first time a write is requested or the overlay already
//! holds a materialised copy. The transition is one-way (spec §4.8's only
//! non-trivial state machine).

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use crate::errno::SysErr;
use crate::fd::{CowMode, FileHandle};

use super::OpenFlags;

fn to_sys_err(e: std::io::Error) -> SysErr {
    SysErr::from_host_io_error(nix::errno::Errno::from_raw(
        e.raw_os_error().unwrap_or(libc::EIO),
    ))
}

/// Open `host_path`, materialising into `overlay_path` (the `cow/<path>`
/// location) when a write is requested or a copy already exists there.
pub fn open(host_path: &str, overlay_path: &Path, flags: OpenFlags) -> Result<FileHandle, SysErr> {
    let already_materialised = overlay_path.is_file();

    if !flags.write_requested && !already_materialised {
        let file = File::open(host_path).map_err(to_sys_err)?;
        return Ok(FileHandle::Cow(CowMode::Passthrough(file)));
    }

    if !already_materialised {
        materialise(host_path, overlay_path)?;
    }

    let mut opts = OpenOptions::new();
    opts.read(true).write(true);
    if flags.truncate {
        opts.truncate(true);
    }
    let file = opts.open(overlay_path).map_err(to_sys_err)?;
    Ok(FileHandle::Cow(CowMode::Writecopy(file)))
}

fn materialise(host_path: &str, overlay_path: &Path) -> Result<(), SysErr> {
    if let Some(parent) = overlay_path.parent() {
        fs::create_dir_all(parent).map_err(to_sys_err)?;
    }
    match fs::copy(host_path, overlay_path) {
        Ok(_) => Ok(()),
        // The host file may not exist yet (O_CREAT on a new path); an empty
        // overlay file is the correct "original contents".
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            File::create(overlay_path).map_err(to_sys_err)?;
            Ok(())
        }
        Err(e) => Err(to_sys_err(e)),
    }
}
