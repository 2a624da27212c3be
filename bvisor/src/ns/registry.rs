//! Sole owner of all `Thread` and `Namespace` values (spec §3 "ThreadRegistry",
//! §4.7).

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use nix::sched::CloneFlags;

use super::ids::{AbsTgid, AbsTid, NsTgid, NsTid};
use super::namespace::{Namespace, NsKey};
use super::thread::Thread;
use crate::errno::SysErr;
use crate::fd::FdTable;

/// Sole owner of every `Thread` and `Namespace` in the supervisor.
#[derive(Debug)]
pub struct ThreadRegistry {
    threads: HashMap<AbsTid, Thread>,
    namespaces: HashMap<NsKey, Namespace>,
    next_ns_key: u64,
    root_tid: AbsTid,
}

impl ThreadRegistry {
    /// Admit the guest root thread, creating the root namespace
    /// (`depth == 1`) and assigning it `NsTid == 1`.
    pub fn register_initial(tid: AbsTid, cwd: PathBuf) -> Self {
        let root_key = NsKey(0);
        let mut root_ns = Namespace::root(root_key);
        root_ns.admit(tid);

        let mut namespaces = HashMap::new();
        namespaces.insert(root_key, root_ns);

        let mut threads = HashMap::new();
        threads.insert(
            tid,
            Thread {
                tid,
                tgid: AbsTgid(tid.get()),
                parent: None,
                namespace: root_key,
                cwd,
                fd_table: FdTable::new(),
            },
        );

        Self {
            threads,
            namespaces,
            next_ns_key: 1,
            root_tid: tid,
        }
    }

    pub fn root_tid(&self) -> AbsTid {
        self.root_tid
    }

    pub fn get(&self, tid: AbsTid) -> Result<&Thread, SysErr> {
        self.threads.get(&tid).ok_or(SysErr::Srch)
    }

    pub fn get_mut(&mut self, tid: AbsTid) -> Result<&mut Thread, SysErr> {
        self.threads.get_mut(&tid).ok_or(SysErr::Srch)
    }

    pub fn contains(&self, tid: AbsTid) -> bool {
        self.threads.contains_key(&tid)
    }

    /// Number of known guest threads (spec §4.8 `sysinfo`'s `procs` field).
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    fn namespace(&self, key: NsKey) -> &Namespace {
        self.namespaces.get(&key).expect("dangling namespace key")
    }

    fn namespace_mut(&mut self, key: NsKey) -> &mut Namespace {
        self.namespaces
            .get_mut(&key)
            .expect("dangling namespace key")
    }

    /// All namespace keys from `start` up to and including the root,
    /// innermost first.
    fn ancestry(&self, start: NsKey) -> Vec<NsKey> {
        let mut chain = vec![start];
        let mut cur = start;
        while let Some(parent) = self.namespace(cur).parent() {
            chain.push(parent);
            cur = parent;
        }
        chain
    }

    /// Admit a newly observed child of `parent_tid`.
    ///
    /// - `CLONE_NEWPID` creates a fresh namespace nested under the parent's,
    ///   admitting the child as `NsTid == 1` there, and as a visible member
    ///   of every ancestor namespace at a freshly assigned `NsTid`.
    /// - `CLONE_THREAD` joins the parent's thread group (same `tgid`, same
    ///   namespaces).
    /// - Otherwise the child inherits the parent's innermost namespace at
    ///   the next `NsTid`.
    pub fn register_child(
        &mut self,
        parent_tid: AbsTid,
        child_tid: AbsTid,
        flags: CloneFlags,
    ) -> Result<(), SysErr> {
        let (parent_tgid, parent_ns, parent_cwd, parent_fds) = {
            let parent = self.get(parent_tid)?;
            (
                parent.tgid,
                parent.namespace,
                parent.cwd.clone(),
                parent.fd_table.clone(),
            )
        };

        let fd_table = if flags.contains(CloneFlags::CLONE_FILES) {
            parent_fds
        } else {
            parent_fds.fork_copy()
        };

        let child_ns = if flags.contains(CloneFlags::CLONE_NEWPID) {
            let new_key = NsKey(self.next_ns_key);
            self.next_ns_key += 1;
            let parent_depth = self.namespace(parent_ns).depth();
            let mut ns = Namespace::nested_under(new_key, parent_ns, parent_depth);
            ns.admit(child_tid);
            self.namespaces.insert(new_key, ns);

            // Admit into every ancestor too, at a fresh NsTid each.
            for anc in self.ancestry(parent_ns) {
                self.namespace_mut(anc).admit(child_tid);
            }
            new_key
        } else {
            self.namespace_mut(parent_ns).admit(child_tid);
            parent_ns
        };

        let tgid = if flags.contains(CloneFlags::CLONE_THREAD) {
            parent_tgid
        } else {
            AbsTgid(child_tid.get())
        };

        self.threads.insert(
            child_tid,
            Thread {
                tid: child_tid,
                tgid,
                parent: Some(parent_tid),
                namespace: child_ns,
                cwd: parent_cwd,
                fd_table,
            },
        );

        Ok(())
    }

    /// Remove `tid` from every namespace it occurs in, destroying any
    /// namespace left empty. If `tid` was a thread-group leader with
    /// surviving children, those children are supervisor-side reparented to
    /// the guest root (the kernel performs its own, real reparenting
    /// independently).
    pub fn handle_exit(&mut self, tid: AbsTid) {
        let Some(thread) = self.threads.remove(&tid) else {
            return;
        };

        // Remove from every ancestor namespace; destroy empty ones.
        let mut to_destroy = Vec::new();
        for anc in self.ancestry(thread.namespace) {
            if let Some(ns) = self.namespaces.get_mut(&anc) {
                if ns.remove(tid) && anc != NsKey(0) {
                    to_destroy.push(anc);
                }
            }
        }
        for key in to_destroy {
            self.namespaces.remove(&key);
        }

        if thread.is_group_leader() {
            for child in self.threads.values_mut() {
                if child.parent == Some(tid) {
                    child.parent = Some(self.root_tid);
                }
            }
        }
    }

    /// Resolve `ns_tgid` as seen from `viewer`'s innermost namespace.
    pub fn get_namespaced(&self, viewer: AbsTid, ns_tgid: NsTgid) -> Result<&Thread, SysErr> {
        let viewer_ns = self.get(viewer)?.namespace;
        let abs_tid = self
            .namespace(viewer_ns)
            .abs_tid_of(ns_tgid.as_tid())
            .ok_or(SysErr::Srch)?;
        self.get(abs_tid)
    }

    /// `true` iff `viewer`'s innermost namespace is an ancestor of (or equal
    /// to) `target`'s innermost namespace.
    pub fn is_visible_to(&self, viewer: AbsTid, target: AbsTid) -> bool {
        let (Ok(v), Ok(t)) = (self.get(viewer), self.get(target)) else {
            return false;
        };
        self.ancestry(t.namespace).contains(&v.namespace)
    }

    /// The `NsTid` of `tid` as seen from the namespace `viewer` sits in.
    pub fn ns_tid_for(&self, viewer: AbsTid, tid: AbsTid) -> Option<NsTid> {
        let viewer_ns = self.get(viewer).ok()?.namespace;
        self.namespace(viewer_ns).ns_tid_of(tid)
    }

    /// Every thread currently sharing `tgid` (spec §4.8 `exit_group`: "every
    /// thread in its group").
    pub fn threads_in_group(&self, tgid: AbsTgid) -> Vec<AbsTid> {
        self.threads
            .values()
            .filter(|t| t.tgid == tgid)
            .map(|t| t.tid)
            .collect()
    }

    /// Opportunistic re-scan of `/proc/<child>/status` for threads that
    /// appeared via a clone the supervisor hasn't traced yet (spec §4.7,
    /// §5 "handlers must therefore tolerate observing a child's syscall
    /// before the parent's clone-trap has been processed").
    pub fn sync_new_threads(&mut self, parent_tid: AbsTid, child_tid: AbsTid) -> Result<(), SysErr> {
        if self.contains(child_tid) {
            return Ok(());
        }
        let flags = infer_clone_flags(parent_tid, child_tid);
        self.register_child(parent_tid, child_tid, flags)
    }
}

/// Infer clone flags from `/proc/<child>/status` when the trap itself
/// couldn't determine them from registers alone (spec §4.7 "Clone-flag
/// detection").
fn infer_clone_flags(parent_tid: AbsTid, child_tid: AbsTid) -> CloneFlags {
    let Ok(status) = fs::read_to_string(format!("/proc/{}/status", child_tid.get())) else {
        return CloneFlags::empty();
    };
    parse_clone_flags_from_status(parent_tid, child_tid, &status)
}

fn parse_clone_flags_from_status(
    _parent_tid: AbsTid,
    child_tid: AbsTid,
    status: &str,
) -> CloneFlags {
    let mut pid = None;
    let mut tgid = None;
    let mut nspid_len = 0usize;

    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("Pid:") {
            pid = rest.trim().parse::<i32>().ok();
        } else if let Some(rest) = line.strip_prefix("Tgid:") {
            tgid = rest.trim().parse::<i32>().ok();
        } else if let Some(rest) = line.strip_prefix("NSpid:") {
            nspid_len = rest.split_whitespace().count();
        }
    }

    let mut flags = CloneFlags::empty();
    // More than one NSpid entry beyond the host-visible one means the
    // child crossed a fresh PID-namespace boundary.
    if nspid_len > 1 {
        flags |= CloneFlags::CLONE_NEWPID;
    }
    if let (Some(pid), Some(tgid)) = (pid, tgid) {
        if pid == tgid {
            // New thread group (own leader): not CLONE_THREAD.
        } else if pid == child_tid.get() {
            flags |= CloneFlags::CLONE_THREAD;
        }
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ThreadRegistry {
        ThreadRegistry::register_initial(AbsTid(100), PathBuf::from("/"))
    }

    #[test]
    fn namespace_isolation_scenario() {
        // spec §8 scenario 4
        let mut reg = registry();
        reg.register_child(AbsTid(100), AbsTid(200), CloneFlags::CLONE_NEWPID)
            .unwrap();

        let child_ns_tid = reg.ns_tid_for(AbsTid(200), AbsTid(200)).unwrap();
        assert_eq!(child_ns_tid, NsTid(1));

        // getppid: parent (100) is not visible from inside the new
        // namespace, so handlers answer 0 — verified at the handler layer;
        // here we confirm the registry reports it as not visible.
        assert!(!reg.is_visible_to(AbsTid(200), AbsTid(100)));
    }

    #[test]
    fn plain_child_inherits_parent_namespace() {
        let mut reg = registry();
        reg.register_child(AbsTid(100), AbsTid(101), CloneFlags::empty())
            .unwrap();
        assert_eq!(reg.get(AbsTid(101)).unwrap().namespace, NsKey(0));
        assert_eq!(reg.ns_tid_for(AbsTid(101), AbsTid(101)), Some(NsTid(2)));
    }

    #[test]
    fn thread_clone_joins_thread_group() {
        let mut reg = registry();
        reg.register_child(AbsTid(100), AbsTid(101), CloneFlags::CLONE_THREAD)
            .unwrap();
        assert_eq!(reg.get(AbsTid(101)).unwrap().tgid, AbsTgid(100));
    }

    #[test]
    fn exit_removes_from_every_ancestor_namespace() {
        let mut reg = registry();
        reg.register_child(AbsTid(100), AbsTid(200), CloneFlags::CLONE_NEWPID)
            .unwrap();
        let nested = reg.get(AbsTid(200)).unwrap().namespace;
        reg.handle_exit(AbsTid(200));
        assert!(!reg.contains(AbsTid(200)));
        assert!(!reg.namespaces.contains_key(&nested));
    }

    #[test]
    fn exit_reparents_surviving_children_to_root() {
        let mut reg = registry();
        reg.register_child(AbsTid(100), AbsTid(101), CloneFlags::empty())
            .unwrap();
        reg.register_child(AbsTid(101), AbsTid(102), CloneFlags::empty())
            .unwrap();
        reg.handle_exit(AbsTid(101));
        assert_eq!(reg.get(AbsTid(102)).unwrap().parent, Some(AbsTid(100)));
    }

    #[test]
    fn parse_infers_newpid_from_multi_entry_nspid() {
        let status = "Name:\tfoo\nPid:\t5\nTgid:\t5\nNSpid:\t200\t1\n";
        let flags = parse_clone_flags_from_status(AbsTid(100), AbsTid(200), status);
        assert!(flags.contains(CloneFlags::CLONE_NEWPID));
    }
}
