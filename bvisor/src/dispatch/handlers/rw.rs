//! `read`/`readv`/`write`/`writev` (spec §4.8).

use crate::dispatch::{HandlerContext, HandlerResult};
use crate::errno::SysErr;
use crate::fd::VirtualFd;
use crate::notify::Notification;

/// Kernel `struct iovec` on a 64-bit guest: two 8-byte fields.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct GuestIovec {
    base: u64,
    len: u64,
}

pub fn read(ctx: &mut HandlerContext<'_>, notif: &Notification) -> HandlerResult {
    let fd = notif.arg(0) as i32;
    if fd == 0 {
        return HandlerResult::Continue;
    }
    let buf_addr = notif.arg(1);
    let count = (notif.arg(2) as usize).min(super::STAGING_CAP);

    match read_into_staging(ctx, notif.tid, fd, count) {
        Ok(staging) => match ctx.memory.write_slice(notif.tid, buf_addr, &staging) {
            Ok(()) => HandlerResult::Success(staging.len() as i64),
            Err(e) => HandlerResult::Error(e),
        },
        Err(e) => HandlerResult::Error(e),
    }
}

pub fn readv(ctx: &mut HandlerContext<'_>, notif: &Notification) -> HandlerResult {
    let fd = notif.arg(0) as i32;
    if fd == 0 {
        return HandlerResult::Continue;
    }
    let iov_addr = notif.arg(1);
    let iovcnt = notif.arg(2) as usize;

    let iovecs = match read_iovecs(ctx, notif.tid, iov_addr, iovcnt) {
        Ok(v) => v,
        Err(e) => return HandlerResult::Error(e),
    };
    let total: usize = iovecs.iter().map(|v| v.len as usize).sum::<usize>().min(super::STAGING_CAP);

    let staging = match read_into_staging(ctx, notif.tid, fd, total) {
        Ok(s) => s,
        Err(e) => return HandlerResult::Error(e),
    };

    let mut offset = 0usize;
    for iov in &iovecs {
        if offset >= staging.len() {
            break;
        }
        let take = (iov.len as usize).min(staging.len() - offset);
        if let Err(e) = ctx.memory.write_slice(notif.tid, iov.base, &staging[offset..offset + take]) {
            return HandlerResult::Error(e);
        }
        offset += take;
    }
    HandlerResult::Success(staging.len() as i64)
}

pub fn write(ctx: &mut HandlerContext<'_>, notif: &Notification) -> HandlerResult {
    let fd = notif.arg(0) as i32;
    if fd == 1 || fd == 2 {
        return HandlerResult::Continue;
    }
    let buf_addr = notif.arg(1);
    let count = (notif.arg(2) as usize).min(super::STAGING_CAP);

    let mut staging = vec![0u8; count];
    if let Err(e) = ctx.memory.read_slice(notif.tid, buf_addr, &mut staging) {
        return HandlerResult::Error(e);
    }
    write_from_staging(ctx, notif.tid, fd, &staging)
}

pub fn writev(ctx: &mut HandlerContext<'_>, notif: &Notification) -> HandlerResult {
    let fd = notif.arg(0) as i32;
    if fd == 1 || fd == 2 {
        return HandlerResult::Continue;
    }
    let iov_addr = notif.arg(1);
    let iovcnt = notif.arg(2) as usize;

    let iovecs = match read_iovecs(ctx, notif.tid, iov_addr, iovcnt) {
        Ok(v) => v,
        Err(e) => return HandlerResult::Error(e),
    };

    let mut staging = Vec::new();
    for iov in &iovecs {
        if staging.len() >= super::STAGING_CAP {
            break;
        }
        let take = (iov.len as usize).min(super::STAGING_CAP - staging.len());
        let mut chunk = vec![0u8; take];
        if let Err(e) = ctx.memory.read_slice(notif.tid, iov.base, &mut chunk) {
            return HandlerResult::Error(e);
        }
        staging.extend_from_slice(&chunk);
    }
    write_from_staging(ctx, notif.tid, fd, &staging)
}

fn read_into_staging(
    ctx: &mut HandlerContext<'_>,
    tid: crate::ns::AbsTid,
    fd: i32,
    count: usize,
) -> Result<Vec<u8>, SysErr> {
    let thread = ctx.registry.get(tid)?;
    let handle = thread.fd_table.get(VirtualFd(fd))?;
    let mut staging = vec![0u8; count];
    let n = handle.lock().unwrap_or_else(|e| e.into_inner()).read(&mut staging)?;
    staging.truncate(n);
    Ok(staging)
}

fn write_from_staging(
    ctx: &mut HandlerContext<'_>,
    tid: crate::ns::AbsTid,
    fd: i32,
    bytes: &[u8],
) -> HandlerResult {
    let thread = match ctx.registry.get(tid) {
        Ok(t) => t,
        Err(e) => return HandlerResult::Error(e),
    };
    let handle = match thread.fd_table.get(VirtualFd(fd)) {
        Ok(h) => h,
        Err(e) => return HandlerResult::Error(e),
    };
    match handle.lock().unwrap_or_else(|e| e.into_inner()).write(bytes) {
        Ok(n) => HandlerResult::Success(n as i64),
        Err(e) => HandlerResult::Error(e),
    }
}

fn read_iovecs(
    ctx: &mut HandlerContext<'_>,
    tid: crate::ns::AbsTid,
    addr: u64,
    count: usize,
) -> Result<Vec<GuestIovec>, SysErr> {
    let mut iovecs = Vec::with_capacity(count);
    for i in 0..count {
        let entry_addr = addr + (i * std::mem::size_of::<GuestIovec>()) as u64;
        let iov: GuestIovec = ctx.memory.read(tid, entry_addr)?;
        iovecs.push(iov);
    }
    Ok(iovecs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fd::FileHandle;
    use crate::fs::OverlayRoot;
    use crate::memory::{MemoryBridge, MemoryMode};
    use crate::notify::SeccompData;
    use crate::ns::ThreadRegistry;
    use std::path::PathBuf;
    use std::time::Instant;

    fn notif(tid: crate::ns::AbsTid, nr: i32, args: [u64; 6]) -> Notification {
        Notification {
            id: 1,
            tid,
            data: SeccompData { nr, arch: 0, instruction_pointer: 0, args },
        }
    }

    #[test]
    fn readv_scatters_across_two_iovecs() {
        // spec §8 scenario 5
        let caller = crate::ns::AbsTid(100);
        let mut registry = ThreadRegistry::register_initial(caller, PathBuf::from("/"));
        let vfd = registry
            .get(caller)
            .unwrap()
            .fd_table
            .insert(FileHandle::Proc { content: b"12345\n".to_vec(), offset: 0 });

        let overlay_dir = tempfile::TempDir::new().unwrap();
        let overlay = OverlayRoot::create_for_test(overlay_dir.path()).unwrap();
        let memory = MemoryBridge::new(MemoryMode::Local);

        let mut guest_bufs = [[0u8; 3], [0u8; 3]];
        let mut iovecs = [
            GuestIovec { base: guest_bufs[0].as_mut_ptr() as u64, len: 3 },
            GuestIovec { base: guest_bufs[1].as_mut_ptr() as u64, len: 3 },
        ];
        let iov_addr = iovecs.as_mut_ptr() as u64;

        let mut ctx = HandlerContext {
            registry: &mut registry,
            overlay: &overlay,
            memory: &memory,
            started_at: Instant::now(),
            time_scaling: None,
        };
        let n = notif(caller, 0, [vfd.0 as u64, iov_addr, 2, 0, 0, 0]);
        let result = readv(&mut ctx, &n);
        match result {
            HandlerResult::Success(total) => assert_eq!(total, 6),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(&guest_bufs[0], b"123");
        assert_eq!(&guest_bufs[1], b"45\n");
    }

    #[test]
    fn read_from_stdin_continues() {
        let caller = crate::ns::AbsTid(100);
        let mut registry = ThreadRegistry::register_initial(caller, PathBuf::from("/"));
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
        let n = notif(caller, 0, [0, 0, 8, 0, 0, 0]);
        assert!(matches!(read(&mut ctx, &n), HandlerResult::Continue));
    }
}
