//! `faccessat` (spec §4.8).

use crate::dispatch::{HandlerContext, HandlerResult};
use crate::errno::SysErr;
use crate::fs::backends::proc;
use crate::fs::{Backend, RouteResult};
use crate::notify::Notification;

pub fn faccessat(ctx: &mut HandlerContext<'_>, notif: &Notification) -> HandlerResult {
    let path_addr = notif.arg(1);

    let (path, routed) = match super::read_and_route(ctx.memory, notif.tid, path_addr) {
        Ok(v) => v,
        Err(e) => return HandlerResult::Error(e),
    };

    match routed {
        RouteResult::Block => HandlerResult::Error(SysErr::Acces),
        RouteResult::Handle(Backend::Proc) => {
            match proc::open(ctx.registry, notif.tid, &path) {
                Ok(_) => HandlerResult::Success(0),
                Err(e) => HandlerResult::Error(e),
            }
        }
        RouteResult::Handle(Backend::Tmp) => exists(&ctx.overlay.tmp_path(&path)),
        RouteResult::Handle(Backend::Cow) => {
            let overlay_path = ctx.overlay.cow_path(&path);
            if overlay_path.is_file() {
                exists(&overlay_path)
            } else {
                exists(std::path::Path::new(&path))
            }
        }
        RouteResult::Handle(Backend::Passthrough) => exists(std::path::Path::new(&path)),
    }
}

fn exists(path: &std::path::Path) -> HandlerResult {
    if path.exists() {
        HandlerResult::Success(0)
    } else {
        HandlerResult::Error(SysErr::NoEnt)
    }
}
