//! `close` (spec §4.8).

use crate::dispatch::{HandlerContext, HandlerResult};
use crate::fd::VirtualFd;
use crate::notify::Notification;

pub fn handle(ctx: &mut HandlerContext<'_>, notif: &Notification) -> HandlerResult {
    let fd = notif.arg(0) as i32;
    if fd == 0 || fd == 1 || fd == 2 {
        return HandlerResult::Continue;
    }
    let thread = match ctx.registry.get(notif.tid) {
        Ok(t) => t,
        Err(e) => return HandlerResult::Error(e),
    };
    match thread.fd_table.remove(VirtualFd(fd)) {
        Ok(handle) => {
            if let Ok(inner) = std::sync::Arc::try_unwrap(handle) {
                inner.into_inner().unwrap_or_else(|e| e.into_inner()).close();
            }
            HandlerResult::Success(0)
        }
        Err(e) => HandlerResult::Error(e),
    }
}
