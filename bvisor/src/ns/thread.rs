//! A single virtualised execution context (spec §3 "Thread").

use std::path::PathBuf;

use super::ids::{AbsTgid, AbsTid};
use super::namespace::NsKey;
use crate::fd::FdTable;

/// Attributes of one guest thread, as tracked by the `ThreadRegistry`.
///
/// `parent` and `namespace` are stored as keys into the registry's arenas
/// rather than owned/pointer links (spec §9): a `Thread` never outlives the
/// `ThreadRegistry` that issued its ids, so indices are sufficient and avoid
/// any cyclic-ownership concern.
#[derive(Debug)]
pub struct Thread {
    pub tid: AbsTid,
    pub tgid: AbsTgid,
    pub parent: Option<AbsTid>,
    pub namespace: NsKey,
    pub cwd: PathBuf,
    pub fd_table: FdTable,
}

impl Thread {
    pub fn is_group_leader(&self) -> bool {
        self.tgid.as_tid() == self.tid
    }
}
