//! Read-only view of a host path, used for safe device files (spec §4.5
//! "Passthrough").

use std::fs::File;

use crate::errno::SysErr;
use crate::fd::FileHandle;

use super::OpenFlags;

/// Opens `host_path` directly. Any write access is refused at open time.
pub fn open(host_path: &str, flags: OpenFlags) -> Result<FileHandle, SysErr> {
    if flags.write_requested {
        return Err(SysErr::Io);
    }
    let file = File::open(host_path).map_err(|e| {
        SysErr::from_host_io_error(nix::errno::Errno::from_raw(
            e.raw_os_error().unwrap_or(libc::EIO),
        ))
    })?;
    Ok(FileHandle::Passthrough(file))
}
