//! `kill(tgid, sig)` (spec §4.8).

use crate::dispatch::{HandlerContext, HandlerResult};
use crate::errno::SysErr;
use crate::notify::Notification;
use crate::ns::NsTgid;

pub fn handle(ctx: &mut HandlerContext<'_>, notif: &Notification) -> HandlerResult {
    let ns_tgid = notif.arg(0) as i32;
    let sig = notif.arg(1) as i32;

    if ns_tgid <= 0 {
        return HandlerResult::Error(SysErr::Inval);
    }

    let abs_tgid = match ctx.registry.get_namespaced(notif.tid, NsTgid(ns_tgid)) {
        Ok(thread) => thread.tgid,
        Err(e) => return HandlerResult::Error(e),
    };

    let target = nix::unistd::Pid::from_raw(abs_tgid.get());
    let signal = nix::sys::signal::Signal::try_from(sig).ok();
    match signal {
        Some(signal) => match nix::sys::signal::kill(target, signal) {
            Ok(()) => HandlerResult::Success(0),
            Err(nix::errno::Errno::ESRCH) => HandlerResult::Error(SysErr::Srch),
            Err(_) => HandlerResult::Error(SysErr::Inval),
        },
        None => HandlerResult::Error(SysErr::Inval),
    }
}
