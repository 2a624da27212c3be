//! Guest-visible errno taxonomy (spec §7).
//!
//! Handlers return a `SysErr` rather than a raw `i32` so that the dispatcher
//! has a closed set of outcomes to serialise into a notification reply.
//! Internal plumbing failures (overlay setup, bootstrap) use
//! `bvisor_shared::BvisorError` instead, since those never cross the
//! syscall-reply boundary.

use nix::errno::Errno;

/// A syscall-reply-visible error, one-to-one with a POSIX errno.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysErr {
    /// Blocked path or denied write on a read-only backend (openat/faccessat).
    Acces,
    /// Blocked path on the stat family (fstat/fstatat), per the Open Question
    /// resolution in SPEC_FULL.md §9(a).
    Perm,
    /// Name resolution failure.
    NoEnt,
    /// A NUL terminator was not found within the caller's buffer.
    NameTooLong,
    /// A relative path reached a handler that requires an absolute one.
    Inval,
    /// Too many levels of symbolic links (reserved for future path resolution).
    Loop,
    /// A virtual FD is not present in the caller's FD table.
    BadF,
    /// No free virtual FDs remain.
    MFile,
    /// Backend I/O failure, including a read-only-backend write (surfaced
    /// opaquely per spec §4.8 rather than leaking `Rofs`).
    Io,
    /// Overlay or tmpfs ran out of space.
    NoSpc,
    /// File grew past an implementation limit.
    FBig,
    /// Allocation failure inside a backend.
    NoMem,
    /// Target thread/thread-group is not visible or no longer exists.
    Srch,
    /// Guest memory address was invalid or unreadable/unwritable.
    Fault,
    /// No handler implements this syscall's semantics (dispatcher panic
    /// recovery, or a handler that intentionally declines).
    NoSys,
}

impl SysErr {
    /// The `errno` value the kernel should hand back to the guest.
    pub fn to_errno(self) -> Errno {
        match self {
            SysErr::Acces => Errno::EACCES,
            SysErr::Perm => Errno::EPERM,
            SysErr::NoEnt => Errno::ENOENT,
            SysErr::NameTooLong => Errno::ENAMETOOLONG,
            SysErr::Inval => Errno::EINVAL,
            SysErr::Loop => Errno::ELOOP,
            SysErr::BadF => Errno::EBADF,
            SysErr::MFile => Errno::EMFILE,
            SysErr::Io => Errno::EIO,
            SysErr::NoSpc => Errno::ENOSPC,
            SysErr::FBig => Errno::EFBIG,
            SysErr::NoMem => Errno::ENOMEM,
            SysErr::Srch => Errno::ESRCH,
            SysErr::Fault => Errno::EFAULT,
            SysErr::NoSys => Errno::ENOSYS,
        }
    }

    /// Negative errno value as written into a `seccomp_notif_resp.error` field.
    pub fn to_neg_i32(self) -> i32 {
        -(self.to_errno() as i32)
    }

    /// Translate a raw host `Errno` observed from a backend syscall into the
    /// opaque `Io` outcome, per spec §7 ("EROFS surfaced as EIO to keep
    /// policy opaque") while still passing through identity-relevant errors.
    pub fn from_host_io_error(errno: Errno) -> SysErr {
        match errno {
            Errno::ENOSPC => SysErr::NoSpc,
            Errno::EFBIG => SysErr::FBig,
            Errno::ENOMEM => SysErr::NoMem,
            Errno::ENOENT => SysErr::NoEnt,
            Errno::EACCES => SysErr::Acces,
            _ => SysErr::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_expected_errno() {
        assert_eq!(SysErr::Acces.to_errno(), Errno::EACCES);
        assert_eq!(SysErr::Perm.to_errno(), Errno::EPERM);
        assert_eq!(SysErr::NoSys.to_errno(), Errno::ENOSYS);
    }

    #[test]
    fn neg_i32_is_negative_errno() {
        assert_eq!(SysErr::BadF.to_neg_i32(), -(Errno::EBADF as i32));
    }

    #[test]
    fn rofs_style_failures_surface_as_io() {
        assert_eq!(SysErr::from_host_io_error(Errno::EROFS), SysErr::Io);
        assert_eq!(SysErr::from_host_io_error(Errno::ENOSPC), SysErr::NoSpc);
    }
}
