//! Per-syscall argument parsing, policy, and result packaging (spec §4.8).

pub mod access;
pub mod close;
pub mod exit;
pub mod identity;
pub mod kill;
pub mod openat;
pub mod rw;
pub mod stat;
pub mod sysinfo;
pub mod sleep;

use crate::errno::SysErr;
use crate::fs::{self, RouteResult};

/// Per-memory-bridge-copy cap (spec §4.8 "capped at 4 KiB per call").
pub const STAGING_CAP: usize = 4096;
const PATH_MAX: usize = 4096;

/// Read, normalise, and route an absolute path argument. Relative paths are
/// rejected here (spec §4.4 "relative paths are rejected by callers").
pub fn read_and_route(
    memory: &crate::memory::MemoryBridge,
    tid: crate::ns::AbsTid,
    path_addr: u64,
) -> Result<(String, RouteResult), SysErr> {
    let mut buf = [0u8; PATH_MAX];
    let raw = memory.read_string(tid, path_addr, &mut buf)?;
    let normalised = fs::normalize(raw)?;
    let routed = fs::route(&normalised);
    Ok((normalised, routed))
}
