//! Cross-address-space memory bridge (spec §4.3).
//!
//! Production reads/writes go through `process_vm_readv`/`process_vm_writev`
//! (spec §6); a `Local` mode reinterprets the guest address as a
//! supervisor-local pointer so handlers can be exercised in tests without a
//! second process (spec §4.3 "a test-mode build").

use std::ffi::c_void;

use crate::errno::SysErr;
use crate::ns::AbsTid;

/// Which address space `addr` arguments are resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryMode {
    /// `addr` is a guest virtual address; bridged via `process_vm_{readv,writev}`.
    Process,
    /// `addr` is treated as a supervisor-local pointer (test builds only).
    Local,
}

/// The memory bridge. Cheap to construct; holds no state beyond the mode.
#[derive(Debug, Clone, Copy)]
pub struct MemoryBridge {
    mode: MemoryMode,
}

impl MemoryBridge {
    pub fn new(mode: MemoryMode) -> Self {
        Self { mode }
    }

    /// Copy exactly `size_of::<T>()` bytes from the guest and reinterpret
    /// them as `T`. `T` must be plain-old-data; callers are responsible for
    /// only instantiating this for `#[repr(C)]`, no-padding-surprise types.
    pub fn read<T: Copy>(&self, tid: AbsTid, addr: u64) -> Result<T, SysErr> {
        let mut value = std::mem::MaybeUninit::<T>::uninit();
        let buf = unsafe {
            std::slice::from_raw_parts_mut(value.as_mut_ptr() as *mut u8, std::mem::size_of::<T>())
        };
        self.read_slice(tid, addr, buf)?;
        Ok(unsafe { value.assume_init() })
    }

    /// Fill `buf` completely from the guest, or fail.
    pub fn read_slice(&self, tid: AbsTid, addr: u64, buf: &mut [u8]) -> Result<(), SysErr> {
        match self.mode {
            MemoryMode::Local => {
                if addr == 0 {
                    return Err(SysErr::Fault);
                }
                let src = unsafe { std::slice::from_raw_parts(addr as *const u8, buf.len()) };
                buf.copy_from_slice(src);
                Ok(())
            }
            MemoryMode::Process => process_vm_read(tid, addr, buf),
        }
    }

    /// Read at most `buf.len()` bytes and return the prefix up to the first
    /// NUL, as UTF-8. Fails `NAMETOOLONG` if no NUL is found within `buf`.
    pub fn read_string<'a>(
        &self,
        tid: AbsTid,
        addr: u64,
        buf: &'a mut [u8],
    ) -> Result<&'a str, SysErr> {
        self.read_slice(tid, addr, buf)?;
        let nul = buf.iter().position(|&b| b == 0).ok_or(SysErr::NameTooLong)?;
        std::str::from_utf8(&buf[..nul]).map_err(|_| SysErr::Fault)
    }

    pub fn write<T: Copy>(&self, tid: AbsTid, addr: u64, value: T) -> Result<(), SysErr> {
        let bytes = unsafe {
            std::slice::from_raw_parts(&value as *const T as *const u8, std::mem::size_of::<T>())
        };
        self.write_slice(tid, addr, bytes)
    }

    pub fn write_slice(&self, tid: AbsTid, addr: u64, bytes: &[u8]) -> Result<(), SysErr> {
        match self.mode {
            MemoryMode::Local => {
                if addr == 0 {
                    return Err(SysErr::Fault);
                }
                let dst = unsafe { std::slice::from_raw_parts_mut(addr as *mut u8, bytes.len()) };
                dst.copy_from_slice(bytes);
                Ok(())
            }
            MemoryMode::Process => process_vm_write(tid, addr, bytes),
        }
    }
}

fn process_vm_read(tid: AbsTid, addr: u64, buf: &mut [u8]) -> Result<(), SysErr> {
    let local = libc::iovec {
        iov_base: buf.as_mut_ptr() as *mut c_void,
        iov_len: buf.len(),
    };
    let remote = libc::iovec {
        iov_base: addr as *mut c_void,
        iov_len: buf.len(),
    };
    let n = unsafe { libc::process_vm_readv(tid.get(), &local, 1, &remote, 1, 0) };
    check_uio_result(n, buf.len())
}

fn process_vm_write(tid: AbsTid, addr: u64, bytes: &[u8]) -> Result<(), SysErr> {
    let local = libc::iovec {
        iov_base: bytes.as_ptr() as *mut c_void,
        iov_len: bytes.len(),
    };
    let remote = libc::iovec {
        iov_base: addr as *mut c_void,
        iov_len: bytes.len(),
    };
    let n = unsafe { libc::process_vm_writev(tid.get(), &local, 1, &remote, 1, 0) };
    check_uio_result(n, bytes.len())
}

fn check_uio_result(n: isize, expected: usize) -> Result<(), SysErr> {
    if n < 0 {
        let errno = nix::errno::Errno::last();
        return Err(match errno {
            nix::errno::Errno::ESRCH => SysErr::Srch,
            _ => SysErr::Fault,
        });
    }
    if n as usize != expected {
        return Err(SysErr::Fault);
    }
    Ok(())
}
