//! Virtualised `/proc` entries (spec §4.5 "Proc").
//!
//! Content is rendered once, at open time, into an in-memory buffer; reads
//! and the per-handle offset are then served entirely out of that buffer
//! (`FileHandle::Proc`, spec §9's only non-trivial-free backend besides Cow).

use crate::errno::SysErr;
use crate::fd::FileHandle;
use crate::ns::{AbsTid, NsTgid, ThreadRegistry};

enum Target {
    SelfDir,
    SelfStatus,
    Pid(i32),
    PidStatus(i32),
}

fn classify(path: &str) -> Option<Target> {
    let rest = path.strip_prefix("/proc")?;
    match rest {
        "/self" => Some(Target::SelfDir),
        "/self/status" => Some(Target::SelfStatus),
        _ => {
            let rest = rest.strip_prefix('/')?;
            if let Some(n) = rest.strip_suffix("/status") {
                n.parse().ok().map(Target::PidStatus)
            } else {
                rest.parse().ok().map(Target::Pid)
            }
        }
    }
}

/// Open a virtualised `/proc` path as seen by `viewer`.
pub fn open(registry: &ThreadRegistry, viewer: AbsTid, path: &str) -> Result<FileHandle, SysErr> {
    let target = classify(path).ok_or(SysErr::NoEnt)?;

    let content = match target {
        Target::SelfDir => render_pid(registry, viewer, viewer)?,
        Target::SelfStatus => render_status(registry, viewer, viewer)?,
        Target::Pid(ns_tgid) => {
            let abs = resolve(registry, viewer, ns_tgid)?;
            render_pid(registry, viewer, abs)?
        }
        Target::PidStatus(ns_tgid) => {
            let abs = resolve(registry, viewer, ns_tgid)?;
            render_status(registry, viewer, abs)?
        }
    };

    Ok(FileHandle::Proc { content, offset: 0 })
}

fn resolve(registry: &ThreadRegistry, viewer: AbsTid, ns_tgid: i32) -> Result<AbsTid, SysErr> {
    let thread = registry
        .get_namespaced(viewer, NsTgid(ns_tgid))
        .map_err(|_| SysErr::NoEnt)?;
    Ok(thread.tid)
}

/// `/proc/<n>`: a decimal `NsTid` followed by newline, matching spec scenario
/// 3's `"1\n"` literal for the guest root's `/proc/self`.
fn render_pid(registry: &ThreadRegistry, viewer: AbsTid, target: AbsTid) -> Result<Vec<u8>, SysErr> {
    let ns_tid = registry.ns_tid_for(viewer, target).ok_or(SysErr::NoEnt)?;
    Ok(format!("{}\n", ns_tid.get()).into_bytes())
}

fn render_status(registry: &ThreadRegistry, viewer: AbsTid, target: AbsTid) -> Result<Vec<u8>, SysErr> {
    let thread = registry.get(target)?;
    let pid = registry.ns_tid_for(viewer, target).ok_or(SysErr::NoEnt)?;
    let ppid = thread
        .parent
        .and_then(|p| registry.ns_tid_for(viewer, p))
        .map(|n| n.get())
        .unwrap_or(0);

    Ok(format!("Name:\tbvisor-guest\nPid:\t{pid}\nPPid:\t{ppid}\nNSpid:\t{pid}\n").into_bytes())
}
