//! `openat` (spec §4.8).

use crate::dispatch::{HandlerContext, HandlerResult};
use crate::errno::SysErr;
use crate::fs::backends::{cow, passthrough, proc, tmp, OpenFlags};
use crate::fs::{Backend, RouteResult};
use crate::notify::Notification;
use crate::ns::AbsTid;

pub fn handle(ctx: &mut HandlerContext<'_>, notif: &Notification) -> HandlerResult {
    let caller = notif.tid;
    match open(ctx, caller, notif) {
        Ok(vfd) => HandlerResult::Success(vfd as i64),
        Err(e) => HandlerResult::Error(e),
    }
}

fn open(ctx: &mut HandlerContext<'_>, caller: AbsTid, notif: &Notification) -> Result<i32, SysErr> {
    let path_addr = notif.arg(1);
    let raw_flags = notif.arg(2) as i32;
    let mode = notif.arg(3) as u32;

    let (path, routed) = super::read_and_route(ctx.memory, caller, path_addr)?;
    let flags = OpenFlags::from_raw(raw_flags);

    let handle = match routed {
        RouteResult::Block => return Err(SysErr::Acces),
        RouteResult::Handle(Backend::Passthrough) => passthrough::open(&path, flags)?,
        RouteResult::Handle(Backend::Cow) => {
            let overlay_path = ctx.overlay.cow_path(&path);
            cow::open(&path, &overlay_path, flags)?
        }
        RouteResult::Handle(Backend::Tmp) => {
            let overlay_path = ctx.overlay.tmp_path(&path);
            tmp::open(&overlay_path, flags)?
        }
        RouteResult::Handle(Backend::Proc) => proc::open(ctx.registry, caller, &path)?,
    };

    let _ = mode;
    let thread = ctx.registry.get(caller)?;
    let vfd = thread.fd_table.insert(handle);
    Ok(vfd.0)
}
