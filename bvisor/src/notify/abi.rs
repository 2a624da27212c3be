//! Raw kernel ABI for `SECCOMP_RET_USER_NOTIF` (spec §4.1, §6).
//!
//! These mirror `linux/seccomp.h` exactly; field order and sizes matter
//! because they cross the ioctl boundary as plain bytes.

use std::os::fd::RawFd;

pub const SECCOMP_SET_MODE_FILTER: libc::c_int = 1;
pub const SECCOMP_FILTER_FLAG_NEW_LISTENER: libc::c_ulong = 1 << 3;

/// `struct seccomp_data` as handed to the BPF program and embedded in
/// `seccomp_notif`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SeccompData {
    pub nr: i32,
    pub arch: u32,
    pub instruction_pointer: u64,
    pub args: [u64; 6],
}

/// `struct seccomp_notif`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SeccompNotif {
    pub id: u64,
    pub pid: u32,
    pub flags: u32,
    pub data: SeccompData,
}

impl Default for SeccompNotif {
    fn default() -> Self {
        // All-zero is a valid "empty" value; the kernel fills it on RECV.
        unsafe { std::mem::zeroed() }
    }
}

pub const SECCOMP_USER_NOTIF_FLAG_CONTINUE: u32 = 1 << 0;

/// `struct seccomp_notif_resp`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct SeccompNotifResp {
    pub id: u64,
    pub val: i64,
    pub error: i32,
    pub flags: u32,
}

const SECCOMP_IOC_MAGIC: u8 = b'!';

nix::ioctl_readwrite!(seccomp_notif_recv, SECCOMP_IOC_MAGIC, 0, SeccompNotif);
nix::ioctl_readwrite!(seccomp_notif_send, SECCOMP_IOC_MAGIC, 1, SeccompNotifResp);
nix::ioctl_write_ptr!(seccomp_notif_id_valid, SECCOMP_IOC_MAGIC, 2, u64);

/// Install the unconditional trap-all filter described in spec §4.9: a
/// single classic-BPF instruction returning `SECCOMP_RET_USER_NOTIF` for
/// every syscall, with `SECCOMP_FILTER_FLAG_NEW_LISTENER` so the kernel
/// hands back a listener fd instead of delivering signals.
///
/// Must be called after `prctl(PR_SET_NO_NEW_PRIVS, 1)`. Returns the raw
/// listener fd on success.
pub fn install_notify_all_filter() -> std::io::Result<RawFd> {
    let program = [libc::sock_filter {
        code: (libc::BPF_RET | libc::BPF_K) as u16,
        jt: 0,
        jf: 0,
        k: libc::SECCOMP_RET_USER_NOTIF as u32,
    }];

    let filter = libc::sock_fprog {
        len: program.len() as u16,
        filter: program.as_ptr() as *mut libc::sock_filter,
    };

    let ret = unsafe {
        libc::syscall(
            libc::SYS_seccomp,
            SECCOMP_SET_MODE_FILTER,
            SECCOMP_FILTER_FLAG_NEW_LISTENER,
            &filter as *const libc::sock_fprog,
        )
    };

    if ret < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(ret as RawFd)
}
