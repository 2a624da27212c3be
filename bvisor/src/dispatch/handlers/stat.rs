//! `fstat`/`fstatat` (spec §4.8).
//!
//! Blocked paths return `EPERM` here rather than `EACCES` (SPEC_FULL.md
//! §9(a)'s resolution of the "EACCES vs EPERM" open question).

use std::os::unix::fs::MetadataExt;

use crate::dispatch::{HandlerContext, HandlerResult};
use crate::errno::SysErr;
use crate::fd::{FileStat, VirtualFd};
use crate::fs::backends::proc;
use crate::fs::{Backend, RouteResult};
use crate::notify::Notification;

const AT_EMPTY_PATH: i32 = 0x1000;

pub fn fstat(ctx: &mut HandlerContext<'_>, notif: &Notification) -> HandlerResult {
    let fd = notif.arg(0) as i32;
    let statbuf_addr = notif.arg(1);
    match stat_virtual_fd(ctx, notif.tid, fd) {
        Ok(stat) => write_stat(ctx, notif.tid, statbuf_addr, stat),
        Err(e) => HandlerResult::Error(e),
    }
}

pub fn fstatat(ctx: &mut HandlerContext<'_>, notif: &Notification) -> HandlerResult {
    let dirfd = notif.arg(0) as i32;
    let path_addr = notif.arg(1);
    let statbuf_addr = notif.arg(2);
    let flags = notif.arg(3) as i32;

    if flags & AT_EMPTY_PATH != 0 {
        return match stat_virtual_fd(ctx, notif.tid, dirfd) {
            Ok(stat) => write_stat(ctx, notif.tid, statbuf_addr, stat),
            Err(e) => HandlerResult::Error(e),
        };
    }

    match stat_path(ctx, notif.tid, path_addr) {
        Ok(stat) => write_stat(ctx, notif.tid, statbuf_addr, stat),
        Err(e) => HandlerResult::Error(e),
    }
}

fn stat_virtual_fd(
    ctx: &mut HandlerContext<'_>,
    tid: crate::ns::AbsTid,
    fd: i32,
) -> Result<FileStat, SysErr> {
    let thread = ctx.registry.get(tid)?;
    let handle = thread.fd_table.get(VirtualFd(fd))?;
    handle.lock().unwrap_or_else(|e| e.into_inner()).stat()
}

fn stat_path(
    ctx: &mut HandlerContext<'_>,
    tid: crate::ns::AbsTid,
    path_addr: u64,
) -> Result<FileStat, SysErr> {
    let (path, routed) = super::read_and_route(ctx.memory, tid, path_addr)?;

    match routed {
        RouteResult::Block => Err(SysErr::Perm),
        RouteResult::Handle(Backend::Proc) => {
            let mut handle = proc::open(ctx.registry, tid, &path)?;
            handle.stat()
        }
        RouteResult::Handle(Backend::Tmp) => host_stat(&ctx.overlay.tmp_path(&path)),
        RouteResult::Handle(Backend::Cow) => {
            let overlay_path = ctx.overlay.cow_path(&path);
            if overlay_path.is_file() {
                host_stat(&overlay_path)
            } else {
                host_stat(std::path::Path::new(&path))
            }
        }
        RouteResult::Handle(Backend::Passthrough) => host_stat(std::path::Path::new(&path)),
    }
}

fn host_stat(path: &std::path::Path) -> Result<FileStat, SysErr> {
    let meta = std::fs::metadata(path).map_err(|e| {
        SysErr::from_host_io_error(nix::errno::Errno::from_raw(
            e.raw_os_error().unwrap_or(libc::EIO),
        ))
    })?;
    Ok(FileStat {
        size: meta.size(),
        mode: meta.mode(),
        uid: meta.uid(),
        gid: meta.gid(),
    })
}

fn write_stat(
    ctx: &mut HandlerContext<'_>,
    tid: crate::ns::AbsTid,
    addr: u64,
    stat: FileStat,
) -> HandlerResult {
    let mut raw: libc::stat = unsafe { std::mem::zeroed() };
    raw.st_size = stat.size as i64;
    raw.st_mode = stat.mode;
    raw.st_uid = stat.uid;
    raw.st_gid = stat.gid;
    match ctx.memory.write(tid, addr, raw) {
        Ok(()) => HandlerResult::Success(0),
        Err(e) => HandlerResult::Error(e),
    }
}
