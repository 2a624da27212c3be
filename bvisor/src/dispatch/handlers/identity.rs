//! `getpid`/`gettid`/`getppid` (spec §4.8).

use crate::dispatch::{HandlerContext, HandlerResult};
use crate::notify::Notification;

pub fn getpid(ctx: &mut HandlerContext<'_>, notif: &Notification) -> HandlerResult {
    let Ok(thread) = ctx.registry.get(notif.tid) else {
        return HandlerResult::Error(crate::errno::SysErr::Srch);
    };
    let tgid_tid = thread.tgid.as_tid();
    match ctx.registry.ns_tid_for(notif.tid, tgid_tid) {
        Some(ns_tid) => HandlerResult::Success(ns_tid.get() as i64),
        None => HandlerResult::Success(0),
    }
}

pub fn gettid(ctx: &mut HandlerContext<'_>, notif: &Notification) -> HandlerResult {
    match ctx.registry.ns_tid_for(notif.tid, notif.tid) {
        Some(ns_tid) => HandlerResult::Success(ns_tid.get() as i64),
        None => HandlerResult::Success(0),
    }
}

/// Returns 0 when the parent has crossed a `NEWPID` boundary (not visible)
/// or the caller is the guest root (spec §4.8).
pub fn getppid(ctx: &mut HandlerContext<'_>, notif: &Notification) -> HandlerResult {
    let Ok(thread) = ctx.registry.get(notif.tid) else {
        return HandlerResult::Error(crate::errno::SysErr::Srch);
    };
    let Some(parent) = thread.parent else {
        return HandlerResult::Success(0);
    };
    let Ok(parent_thread) = ctx.registry.get(parent) else {
        return HandlerResult::Success(0);
    };
    let parent_tgid_tid = parent_thread.tgid.as_tid();
    match ctx.registry.ns_tid_for(notif.tid, parent_tgid_tid) {
        Some(ns_tid) => HandlerResult::Success(ns_tid.get() as i64),
        None => HandlerResult::Success(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::OverlayRoot;
    use crate::memory::{MemoryBridge, MemoryMode};
    use crate::notify::SeccompData;
    use crate::ns::{AbsTid, ThreadRegistry};
    use nix::sched::CloneFlags;
    use std::path::PathBuf;
    use std::time::Instant;

    fn notif(tid: AbsTid) -> Notification {
        Notification { id: 1, tid, data: SeccompData { nr: 0, arch: 0, instruction_pointer: 0, args: [0; 6] } }
    }

    #[test]
    fn namespace_isolation_scenario() {
        // spec §8 scenario 4
        let mut registry = ThreadRegistry::register_initial(AbsTid(100), PathBuf::from("/"));
        registry
            .register_child(AbsTid(100), AbsTid(200), CloneFlags::CLONE_NEWPID)
            .unwrap();

        let overlay_dir = tempfile::TempDir::new().unwrap();
        let overlay = OverlayRoot::create_for_test(overlay_dir.path()).unwrap();
        let memory = MemoryBridge::new(MemoryMode::Local);
        let mut ctx = HandlerContext {
            registry: &mut registry,
            overlay: &overlay,
            memory: &memory,
            started_at: Instant::now(),
            time_scaling: None,
        };

        let n = notif(AbsTid(200));
        assert!(matches!(getppid(&mut ctx, &n), HandlerResult::Success(0)));
        assert!(matches!(getpid(&mut ctx, &n), HandlerResult::Success(1)));
    }
}
