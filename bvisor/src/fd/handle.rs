//! Tagged file handle — the union of the four file backends (spec §3, §4.5,
//! §9 "Tagged file handle").
//!
//! Dispatch is a match over the tag rather than a trait object: every
//! backend's state lives directly in the enum so the handle can be closed
//! exactly once regardless of which variant it is, without requiring the
//! backend types themselves to be `Clone`.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write as IoWrite};
use std::os::unix::fs::MetadataExt;

use crate::errno::SysErr;

/// A minimal `statx`-equivalent: just the fields the supervisor's handlers
/// need to answer `fstat`/`fstatat` (spec §4.5 "statx(&) → statx").
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStat {
    pub size: u64,
    /// `st_mode` bits (type + permission).
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

const S_IFREG: u32 = 0o100_000;

impl FileStat {
    fn from_host(meta: &std::fs::Metadata) -> Self {
        Self {
            size: meta.size(),
            mode: meta.mode(),
            uid: meta.uid(),
            gid: meta.gid(),
        }
    }

    fn synthetic_regular(size: u64) -> Self {
        Self {
            size,
            mode: S_IFREG | 0o444,
            uid: 0,
            gid: 0,
        }
    }
}

/// CoW materialisation state (spec §4.5, §4.8 "state machines are minimal").
#[derive(Debug)]
pub enum CowMode {
    /// Read-only view of the original host file; writes are rejected.
    Passthrough(File),
    /// Writable view of the overlay copy.
    Writecopy(File),
}

/// The tagged variant of spec §3 "FileHandle".
#[derive(Debug)]
pub enum FileHandle {
    Passthrough(File),
    Cow(CowMode),
    Tmp(File),
    Proc { content: Vec<u8>, offset: u64 },
}

impl FileHandle {
    /// Read up to `buf.len()` bytes, advancing the per-handle offset.
    /// Short reads are permitted (spec §4.5).
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, SysErr> {
        match self {
            FileHandle::Passthrough(f) => host_read(f, buf),
            FileHandle::Cow(CowMode::Passthrough(f)) => host_read(f, buf),
            FileHandle::Cow(CowMode::Writecopy(f)) => host_read(f, buf),
            FileHandle::Tmp(f) => host_read(f, buf),
            FileHandle::Proc { content, offset } => {
                let start = (*offset as usize).min(content.len());
                let n = (content.len() - start).min(buf.len());
                buf[..n].copy_from_slice(&content[start..start + n]);
                *offset += n as u64;
                Ok(n)
            }
        }
    }

    /// Write `bytes`, never short on success (spec §4.5).
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize, SysErr> {
        match self {
            FileHandle::Passthrough(_) => Err(SysErr::Io),
            FileHandle::Cow(CowMode::Passthrough(_)) => Err(SysErr::Io),
            FileHandle::Cow(CowMode::Writecopy(f)) => host_write(f, bytes),
            FileHandle::Tmp(f) => host_write(f, bytes),
            FileHandle::Proc { .. } => Err(SysErr::Io),
        }
    }

    /// `statx`-equivalent metadata for this handle.
    pub fn stat(&self) -> Result<FileStat, SysErr> {
        match self {
            FileHandle::Passthrough(f) => host_stat(f),
            FileHandle::Cow(CowMode::Passthrough(f)) => host_stat(f),
            FileHandle::Cow(CowMode::Writecopy(f)) => host_stat(f),
            FileHandle::Tmp(f) => host_stat(f),
            FileHandle::Proc { content, .. } => Ok(FileStat::synthetic_regular(content.len() as u64)),
        }
    }

    /// Close is infallible from the caller's perspective (spec §4.5); errors
    /// from the underlying `close(2)` are only logged by `Drop`'s default
    /// `File` handling, which never panics.
    pub fn close(self) {
        drop(self);
    }
}

fn host_read(f: &mut File, buf: &mut [u8]) -> Result<usize, SysErr> {
    f.read(buf)
        .map_err(|e| SysErr::from_host_io_error(nix::errno::Errno::from_raw(
            e.raw_os_error().unwrap_or(libc::EIO),
        )))
}

fn host_write(f: &mut File, bytes: &[u8]) -> Result<usize, SysErr> {
    f.write(bytes)
        .map_err(|e| SysErr::from_host_io_error(nix::errno::Errno::from_raw(
            e.raw_os_error().unwrap_or(libc::EIO),
        )))
}

fn host_stat(f: &File) -> Result<FileStat, SysErr> {
    f.metadata()
        .map(|m| FileStat::from_host(&m))
        .map_err(|_| SysErr::Io)
}

/// Seek a handle that supports it. `Proc` handles track their offset
/// explicitly instead (spec §4.5).
pub fn host_seek(f: &mut File, pos: SeekFrom) -> Result<u64, SysErr> {
    f.seek(pos).map_err(|_| SysErr::Io)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proc_handle_serves_from_buffer_and_tracks_offset() {
        let mut h = FileHandle::Proc {
            content: b"12345\n".to_vec(),
            offset: 0,
        };
        let mut buf = [0u8; 3];
        assert_eq!(h.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"123");
        assert_eq!(h.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"45\n");
        assert_eq!(h.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn proc_handle_rejects_writes() {
        let mut h = FileHandle::Proc {
            content: vec![],
            offset: 0,
        };
        assert!(h.write(b"x").is_err());
    }

    #[test]
    fn cow_passthrough_rejects_writes() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let f = File::open(tmp.path()).unwrap();
        let mut h = FileHandle::Cow(CowMode::Passthrough(f));
        assert!(h.write(b"x").is_err());
    }
}
