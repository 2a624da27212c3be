//! The seccomp user-notification transport (spec §4.1, §6).

mod abi;

use std::os::fd::{AsRawFd, BorrowedFd, RawFd};

use crate::errno::SysErr;
use crate::ns::AbsTid;

pub use abi::{install_notify_all_filter, SeccompData, SECCOMP_USER_NOTIF_FLAG_CONTINUE};

/// One trapped syscall, decoded from the kernel's `seccomp_notif`.
#[derive(Debug, Clone, Copy)]
pub struct Notification {
    pub id: u64,
    pub tid: AbsTid,
    pub data: SeccompData,
}

impl Notification {
    pub fn syscall_nr(&self) -> i32 {
        self.data.nr
    }

    pub fn arg(&self, index: usize) -> u64 {
        self.data.args[index]
    }
}

/// The decision the supervisor hands back for a given notification id.
#[derive(Debug, Clone, Copy)]
pub enum Response {
    /// Ask the kernel to execute the trapped syscall itself.
    Continue,
    /// Resolve the syscall as if it had returned `value`.
    Value(i64),
    /// Resolve the syscall as having failed with the given errno.
    Error(SysErr),
}

/// Block on `SECCOMP_IOCTL_NOTIF_RECV` until a syscall is trapped, or the
/// listener is torn down (guest exited).
///
/// Returns `Ok(None)` when the kernel reports the listener has gone stale
/// (`ENOENT`), which happens once the guest's last thread exits.
pub fn receive(listener: BorrowedFd<'_>) -> Result<Option<Notification>, std::io::Error> {
    let mut raw = abi::SeccompNotif::default();
    let res = unsafe { abi::seccomp_notif_recv(listener.as_raw_fd(), &mut raw) };
    match res {
        Ok(_) => Ok(Some(Notification {
            id: raw.id,
            tid: AbsTid(raw.pid as i32),
            data: raw.data,
        })),
        Err(nix::errno::Errno::ENOENT) | Err(nix::errno::Errno::EINTR) => Ok(None),
        Err(e) => Err(std::io::Error::from_raw_os_error(e as i32)),
    }
}

/// Reply to `notification.id` with `response`. If the id has since gone
/// stale (the traced thread was killed before the reply arrived, spec §8
/// scenario 6), the kernel reports `ECANCELED` and this is treated as
/// success: there is nobody left to observe the reply.
pub fn send(
    listener: BorrowedFd<'_>,
    notification_id: u64,
    response: Response,
) -> Result<(), std::io::Error> {
    let (val, error, flags) = match response {
        Response::Continue => (0, 0, SECCOMP_USER_NOTIF_FLAG_CONTINUE),
        Response::Value(v) => (v, 0, 0),
        Response::Error(e) => (-1, e.to_neg_i32(), 0),
    };
    let mut raw = abi::SeccompNotifResp {
        id: notification_id,
        val,
        error,
        flags,
    };
    let res = unsafe { abi::seccomp_notif_send(listener.as_raw_fd(), &mut raw) };
    match res {
        Ok(_) => Ok(()),
        Err(nix::errno::Errno::ECANCELED) => Ok(()),
        Err(e) => Err(std::io::Error::from_raw_os_error(e as i32)),
    }
}

/// Cheap liveness check used before a slow backend call (spec §5): skip the
/// work entirely if the traced thread is already gone.
pub fn id_still_valid(listener: RawFd, notification_id: u64) -> bool {
    unsafe { abi::seccomp_notif_id_valid(listener, &notification_id) }.is_ok()
}
