//! Routes a notification to a handler by syscall number (spec §4.2).
//!
//! Unknown syscall numbers reply `Continue` — default-allow, since the
//! seccomp filter traps every syscall and the sandbox's guarantees come from
//! the narrow set of blocked paths and policy checks rather than an
//! allow-list (spec §9 "Passthrough vs emulation").

pub mod handlers;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use crate::errno::SysErr;
use crate::fs::OverlayRoot;
use crate::memory::MemoryBridge;
use crate::notify::Notification;
use crate::ns::ThreadRegistry;

/// What a handler decided; the dispatcher serialises this into the kernel
/// reply.
#[derive(Debug, Clone, Copy)]
pub enum HandlerResult {
    /// Let the kernel execute the trapped syscall itself.
    Continue,
    /// Emulate success with this return value.
    Success(i64),
    /// Emulate failure with this errno.
    Error(SysErr),
}

/// Everything a handler needs, borrowed for the duration of one dispatch.
pub struct HandlerContext<'a> {
    pub registry: &'a mut ThreadRegistry,
    pub overlay: &'a OverlayRoot,
    pub memory: &'a MemoryBridge,
    pub started_at: Instant,
    /// Experimental `clock_nanosleep` scaling factor (SPEC_FULL.md §9(c));
    /// `None` passes sleeps through unmodified.
    pub time_scaling: Option<f64>,
}

pub struct Dispatcher;

impl Dispatcher {
    /// Dispatch one notification. A handler that panics is treated as
    /// `ENOSYS` and logged rather than unwinding the supervisor loop.
    pub fn dispatch(ctx: &mut HandlerContext<'_>, notif: &Notification) -> HandlerResult {
        let nr = notif.syscall_nr();
        let outcome = catch_unwind(AssertUnwindSafe(|| dispatch_inner(ctx, notif)));
        match outcome {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(syscall_nr = nr, "handler panicked; replying ENOSYS");
                HandlerResult::Error(SysErr::NoSys)
            }
        }
    }
}

fn dispatch_inner(ctx: &mut HandlerContext<'_>, notif: &Notification) -> HandlerResult {
    match notif.syscall_nr() as i64 {
        libc::SYS_openat => handlers::openat::handle(ctx, notif),
        libc::SYS_read => handlers::rw::read(ctx, notif),
        libc::SYS_readv => handlers::rw::readv(ctx, notif),
        libc::SYS_write => handlers::rw::write(ctx, notif),
        libc::SYS_writev => handlers::rw::writev(ctx, notif),
        libc::SYS_close => handlers::close::handle(ctx, notif),
        libc::SYS_fstat => handlers::stat::fstat(ctx, notif),
        libc::SYS_newfstatat => handlers::stat::fstatat(ctx, notif),
        libc::SYS_faccessat => handlers::access::faccessat(ctx, notif),
        libc::SYS_sysinfo => handlers::sysinfo::handle(ctx, notif),
        libc::SYS_getpid => handlers::identity::getpid(ctx, notif),
        libc::SYS_gettid => handlers::identity::gettid(ctx, notif),
        libc::SYS_getppid => handlers::identity::getppid(ctx, notif),
        libc::SYS_kill => handlers::kill::handle(ctx, notif),
        libc::SYS_exit => handlers::exit::exit(ctx, notif),
        libc::SYS_exit_group => handlers::exit::exit_group(ctx, notif),
        libc::SYS_clock_nanosleep => handlers::sleep::clock_nanosleep(ctx, notif),
        _ => HandlerResult::Continue,
    }
}
