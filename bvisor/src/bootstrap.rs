//! Child process launch: seccomp filter install plus cross-process listener
//! fd handoff (SPEC_FULL.md §4.9, spec §6 "Cross-process FD handoff").
//!
//! Grounded in the teacher's `Jailer::add_pre_exec_hook` pattern of doing
//! isolation setup in a `pre_exec` closure rather than hand-rolled
//! `libc::fork`.

use std::ffi::c_void;
use std::os::fd::{FromRawFd, OwnedFd, RawFd};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command};
use std::time::Duration;

use nix::sys::socket::{self, AddressFamily, SockFlag, SockType};

use bvisor_shared::{BvisorError, BvisorResult};

use crate::notify::install_notify_all_filter;

const PIDFD_GETFD_ATTEMPTS: u32 = 100;
const PIDFD_GETFD_RETRY_DELAY: Duration = Duration::from_millis(10);

pub struct LaunchedGuest {
    pub child: Child,
    pub listener: OwnedFd,
}

/// Fork `argv[0]` with `argv[1..]`, install the trap-all seccomp filter in
/// the child, and recover the resulting notification listener fd in the
/// parent via `pidfd_getfd`.
pub fn launch(argv: &[String]) -> BvisorResult<LaunchedGuest> {
    let (parent_sock, child_sock) =
        socket::socketpair(AddressFamily::Unix, SockType::Stream, None, SockFlag::empty())
            .map_err(|e| BvisorError::Bootstrap(format!("socketpair: {e}")))?;

    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..]);

    let child_sock_raw: RawFd = std::os::fd::AsRawFd::as_raw_fd(&child_sock);
    unsafe {
        cmd.pre_exec(move || {
            install_in_child(child_sock_raw).map_err(|e| std::io::Error::from_raw_os_error(e))
        });
    }

    let child = cmd
        .spawn()
        .map_err(|e| BvisorError::Bootstrap(format!("spawn: {e}")))?;
    drop(child_sock);

    let predicted_fd = recv_predicted_fd(&parent_sock)?;
    let listener = recover_listener(child.id() as i32, predicted_fd)?;

    Ok(LaunchedGuest { child, listener })
}

/// Runs after `fork`, before `exec`, inside the child. Must stick to
/// async-signal-safe operations.
fn install_in_child(sock: RawFd) -> Result<(), i32> {
    // Predict the fd seccomp's NEW_LISTENER flag will hand back: it is
    // always the lowest free fd, so dup(0) (then close it again) observes
    // that number without consuming it.
    let predicted = unsafe { libc::dup(0) };
    if predicted < 0 {
        return Err(unsafe { *libc::__errno_location() });
    }
    unsafe { libc::close(predicted) };

    let predicted_bytes = (predicted as i32).to_ne_bytes();
    let n = unsafe {
        libc::send(sock, predicted_bytes.as_ptr() as *const c_void, predicted_bytes.len(), 0)
    };
    if n < 0 {
        return Err(unsafe { *libc::__errno_location() });
    }

    if unsafe { libc::prctl(libc::PR_SET_NO_NEW_PRIVS, 1, 0, 0, 0) } != 0 {
        return Err(unsafe { *libc::__errno_location() });
    }

    install_notify_all_filter().map_err(|e| e.raw_os_error().unwrap_or(libc::EPERM))?;
    Ok(())
}

fn recv_predicted_fd(sock: &OwnedFd) -> BvisorResult<RawFd> {
    let raw = std::os::fd::AsRawFd::as_raw_fd(sock);
    let mut buf = [0u8; 4];
    let n = unsafe { libc::recv(raw, buf.as_mut_ptr() as *mut c_void, buf.len(), 0) };
    if n != buf.len() as isize {
        return Err(BvisorError::Bootstrap(format!(
            "recv predicted fd: short read ({n} bytes)"
        )));
    }
    Ok(i32::from_ne_bytes(buf))
}

/// Open a `pidfd` for `pid` and import `predicted_fd` via `pidfd_getfd`,
/// retrying while the child's filter install is still in flight (spec §6).
fn recover_listener(pid: i32, predicted_fd: RawFd) -> BvisorResult<OwnedFd> {
    let pidfd = unsafe { libc::syscall(libc::SYS_pidfd_open, pid, 0) };
    if pidfd < 0 {
        return Err(BvisorError::Bootstrap(format!(
            "pidfd_open: {}",
            std::io::Error::last_os_error()
        )));
    }
    let pidfd = pidfd as RawFd;

    for attempt in 0..PIDFD_GETFD_ATTEMPTS {
        let fd = unsafe { libc::syscall(libc::SYS_pidfd_getfd, pidfd, predicted_fd, 0) };
        if fd >= 0 {
            unsafe { libc::close(pidfd) };
            return Ok(unsafe { OwnedFd::from_raw_fd(fd as RawFd) });
        }
        let errno = std::io::Error::last_os_error();
        if errno.raw_os_error() != Some(libc::EBADF) {
            unsafe { libc::close(pidfd) };
            return Err(BvisorError::Bootstrap(format!("pidfd_getfd: {errno}")));
        }
        tracing::debug!(attempt, "pidfd_getfd EBADF, retrying");
        std::thread::sleep(PIDFD_GETFD_RETRY_DELAY);
    }

    unsafe { libc::close(pidfd) };
    Err(BvisorError::Bootstrap(format!(
        "pidfd_getfd: exhausted {PIDFD_GETFD_ATTEMPTS} attempts"
    )))
}
