//! Per-thread-group virtual file-descriptor table (spec §3 "FdTable", §4.6).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::errno::SysErr;
use crate::fd::handle::FileHandle;

/// A small non-negative integer handed out to the guest. Values 0–2 are
/// reserved for stdio and are never issued by `insert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualFd(pub i32);

const FIRST_ISSUABLE_FD: i32 = 3;

/// A reference-counted handle to a backend's state. Held both by the table
/// and, temporarily, by any handler in the middle of a backend call — so a
/// `remove` racing a slow `read`/`write` never invalidates an in-flight
/// reference (spec §5).
pub type SharedHandle = Arc<Mutex<FileHandle>>;

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<i32, SharedHandle>,
}

/// Shared, ref-counted FD table. Cloning an `FdTable` (`Arc::clone`) gives
/// `CLONE_FILES`/thread-group semantics; `fork_copy` gives the deep-copy
/// semantics of a plain `fork` (spec §4.6, SPEC_FULL.md §9(b)).
#[derive(Debug, Clone)]
pub struct FdTable {
    inner: Arc<RwLock<Inner>>,
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FdTable {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    /// Deep-copy the current mapping into a brand-new table. The handles
    /// themselves stay reference-counted, so both tables observe the same
    /// underlying file position and bytes (spec §4.6).
    pub fn fork_copy(&self) -> FdTable {
        let src = self.inner.read().unwrap();
        let entries = src.entries.clone();
        FdTable {
            inner: Arc::new(RwLock::new(Inner { entries })),
        }
    }

    /// Insert a handle, returning the lowest unused virtual FD `>= 3`.
    pub fn insert(&self, handle: FileHandle) -> VirtualFd {
        let mut inner = self.inner.write().unwrap();
        let mut candidate = FIRST_ISSUABLE_FD;
        while inner.entries.contains_key(&candidate) {
            candidate += 1;
        }
        inner
            .entries
            .insert(candidate, Arc::new(Mutex::new(handle)));
        VirtualFd(candidate)
    }

    /// Fetch a ref-counted clone of the handle behind `vfd`.
    pub fn get(&self, vfd: VirtualFd) -> Result<SharedHandle, SysErr> {
        let inner = self.inner.read().unwrap();
        inner
            .entries
            .get(&vfd.0)
            .cloned()
            .ok_or(SysErr::BadF)
    }

    /// Remove and return the handle previously at `vfd`. The virtual FD
    /// number is immediately reusable by `insert`; the resource itself stays
    /// alive until every `SharedHandle` clone (e.g. one held by an in-flight
    /// backend call obtained via `get`) is dropped.
    pub fn remove(&self, vfd: VirtualFd) -> Result<SharedHandle, SysErr> {
        let mut inner = self.inner.write().unwrap();
        inner.entries.remove(&vfd.0).ok_or(SysErr::BadF)
    }

    pub fn live_count(&self) -> usize {
        self.inner.read().unwrap().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fd::handle::FileHandle;

    fn proc_handle(bytes: &[u8]) -> FileHandle {
        FileHandle::Proc {
            content: bytes.to_vec(),
            offset: 0,
        }
    }

    #[test]
    fn issued_fds_start_at_three_and_increase() {
        let t = FdTable::new();
        let a = t.insert(proc_handle(b"a"));
        let b = t.insert(proc_handle(b"b"));
        assert_eq!(a, VirtualFd(3));
        assert_eq!(b, VirtualFd(4));
    }

    #[test]
    fn insert_reuses_lowest_free_slot() {
        let t = FdTable::new();
        let a = t.insert(proc_handle(b"a"));
        let _b = t.insert(proc_handle(b"b"));
        t.remove(a).unwrap();
        let c = t.insert(proc_handle(b"c"));
        assert_eq!(c, VirtualFd(3));
    }

    #[test]
    fn get_after_remove_is_bad_fd() {
        let t = FdTable::new();
        let a = t.insert(proc_handle(b"a"));
        t.remove(a).unwrap();
        assert_eq!(t.get(a).unwrap_err(), SysErr::BadF);
    }

    #[test]
    fn open_close_conservation() {
        let t = FdTable::new();
        let a = t.insert(proc_handle(b"a"));
        let b = t.insert(proc_handle(b"b"));
        assert_eq!(t.live_count(), 2);
        t.remove(a).unwrap();
        assert_eq!(t.live_count(), 1);
        t.remove(b).unwrap();
        assert_eq!(t.live_count(), 0);
    }

    #[test]
    fn fork_copy_shares_underlying_handle() {
        let t = FdTable::new();
        let vfd = t.insert(proc_handle(b"12345\n"));
        let forked = t.fork_copy();

        // Both tables see the same handle instance; reading from one
        // advances the offset observed by the other.
        let h1 = t.get(vfd).unwrap();
        let h2 = forked.get(vfd).unwrap();
        let mut buf = [0u8; 3];
        h1.lock().unwrap().read(&mut buf).unwrap();
        let mut buf2 = [0u8; 3];
        h2.lock().unwrap().read(&mut buf2).unwrap();
        assert_eq!(&buf2, b"45\n");

        // But removing from one table doesn't affect the other's mapping.
        t.remove(vfd).unwrap();
        assert!(forked.get(vfd).is_ok());
    }
}
