//! `exit`/`exit_group` (spec §4.8).
//!
//! Both remove the caller from the thread registry and then `Continue`, so
//! the kernel performs the real exit.

use crate::dispatch::{HandlerContext, HandlerResult};
use crate::notify::Notification;

pub fn exit(ctx: &mut HandlerContext<'_>, notif: &Notification) -> HandlerResult {
    ctx.registry.handle_exit(notif.tid);
    HandlerResult::Continue
}

pub fn exit_group(ctx: &mut HandlerContext<'_>, notif: &Notification) -> HandlerResult {
    let tgid = ctx.registry.get(notif.tid).ok().map(|t| t.tgid);
    if let Some(tgid) = tgid {
        for member in ctx.registry.threads_in_group(tgid) {
            ctx.registry.handle_exit(member);
        }
    }
    HandlerResult::Continue
}
