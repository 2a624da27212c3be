//! The four file backends behind `FileHandle` (spec §4.5).

pub mod cow;
pub mod passthrough;
pub mod proc;
pub mod tmp;

/// Bits of the guest's `openat` flags the backends care about. The rest of
/// the flag word (`O_CLOEXEC`, `O_APPEND`, …) is not modelled — only whether
/// a write access was requested and whether `O_CREAT` is in play, since that
/// is what decides CoW materialisation and host-open mode.
#[derive(Debug, Clone, Copy)]
pub struct OpenFlags {
    pub write_requested: bool,
    pub create: bool,
    pub truncate: bool,
}

impl OpenFlags {
    pub fn from_raw(flags: i32) -> Self {
        let access_mode = flags & libc::O_ACCMODE;
        Self {
            write_requested: access_mode == libc::O_WRONLY || access_mode == libc::O_RDWR,
            create: flags & libc::O_CREAT != 0,
            truncate: flags & libc::O_TRUNC != 0,
        }
    }
}
