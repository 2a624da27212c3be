//! `clock_nanosleep` (spec §4.8).
//!
//! Passthrough in production. When `HandlerContext::time_scaling` is set
//! (SPEC_FULL.md §9(c)'s experimental hook), the guest's requested
//! `timespec` is rewritten via the memory bridge before replying
//! `Continue`, so the kernel still performs the actual sleep — just for a
//! scaled duration.

use crate::dispatch::{HandlerContext, HandlerResult};
use crate::notify::Notification;

/// Kernel `struct timespec` on a 64-bit guest.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct GuestTimespec {
    sec: i64,
    nsec: i64,
}

pub fn clock_nanosleep(ctx: &mut HandlerContext<'_>, notif: &Notification) -> HandlerResult {
    let Some(factor) = ctx.time_scaling else {
        return HandlerResult::Continue;
    };

    let rqtp_addr = notif.arg(2);
    let ts: GuestTimespec = match ctx.memory.read(notif.tid, rqtp_addr) {
        Ok(ts) => ts,
        Err(e) => return HandlerResult::Error(e),
    };

    let total_nanos = (ts.sec as f64 * 1e9 + ts.nsec as f64) * factor;
    let scaled = GuestTimespec {
        sec: (total_nanos / 1e9) as i64,
        nsec: (total_nanos % 1e9) as i64,
    };

    match ctx.memory.write(notif.tid, rqtp_addr, scaled) {
        Ok(()) => HandlerResult::Continue,
        Err(e) => HandlerResult::Error(e),
    }
}
