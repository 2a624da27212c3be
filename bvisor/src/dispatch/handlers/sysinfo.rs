//! `sysinfo` (spec §4.8): a hardcoded, plausible-looking snapshot.

use crate::dispatch::{HandlerContext, HandlerResult};
use crate::notify::Notification;

const TOTAL_RAM_BYTES: u64 = 2 * 1024 * 1024 * 1024;
const FREE_RAM_BYTES: u64 = 1024 * 1024 * 1024;

pub fn handle(ctx: &mut HandlerContext<'_>, notif: &Notification) -> HandlerResult {
    let addr = notif.arg(0);

    let mut raw: libc::sysinfo = unsafe { std::mem::zeroed() };
    raw.uptime = ctx.started_at.elapsed().as_secs() as _;
    raw.totalram = TOTAL_RAM_BYTES as _;
    raw.freeram = FREE_RAM_BYTES as _;
    raw.procs = ctx.registry.len().min(u16::MAX as usize) as u16;
    raw.mem_unit = 1;

    match ctx.memory.write(notif.tid, addr, raw) {
        Ok(()) => HandlerResult::Success(0),
        Err(e) => HandlerResult::Error(e),
    }
}
