//! The supervisor loop: receive a trapped syscall, dispatch it, reply
//! (spec §4.1).

use std::fs;
use std::os::fd::{AsFd, OwnedFd};
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Instant;

use bvisor_shared::{BvisorError, BvisorResult};

use crate::bootstrap::{self, LaunchedGuest};
use crate::config::SupervisorConfig;
use crate::dispatch::{Dispatcher, HandlerContext, HandlerResult};
use crate::fs::OverlayRoot;
use crate::memory::{MemoryBridge, MemoryMode};
use crate::notify::{self, Response};
use crate::ns::{AbsTid, ThreadRegistry};

/// Owns every piece of state a running guest needs: the child process, the
/// notification listener, the thread/namespace model, and the overlay
/// directory backing CoW and private `/tmp`.
pub struct Supervisor {
    child: std::process::Child,
    listener: OwnedFd,
    registry: ThreadRegistry,
    overlay: OverlayRoot,
    memory: MemoryBridge,
    config: SupervisorConfig,
}

impl Supervisor {
    /// Launch `argv[0] argv[1..]` under the trap-all seccomp filter and
    /// stand up the supervisor state that will service its syscalls.
    pub fn spawn(argv: &[String], config: SupervisorConfig) -> BvisorResult<Self> {
        if argv.is_empty() {
            return Err(BvisorError::Config("argv must not be empty".into()));
        }

        let LaunchedGuest { child, listener } = bootstrap::launch(argv)?;
        let root_tid = AbsTid(child.id() as i32);
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        let registry = ThreadRegistry::register_initial(root_tid, cwd);
        let overlay = OverlayRoot::create(&config.overlay_parent)?;

        tracing::info!(pid = root_tid.get(), overlay = %overlay.root().display(), "guest launched");

        Ok(Self {
            child,
            listener,
            registry,
            overlay,
            memory: MemoryBridge::new(MemoryMode::Process),
            config,
        })
    }

    /// Service notifications until the guest's last thread exits, then wait
    /// for the child process and return its exit status.
    pub fn run(mut self) -> BvisorResult<ExitStatus> {
        loop {
            let notif = match notify::receive(self.listener.as_fd()) {
                Ok(Some(notif)) => notif,
                Ok(None) => break,
                Err(e) => {
                    return Err(BvisorError::Notify(format!("receive: {e}")));
                }
            };

            if !self.registry.contains(notif.tid) {
                self.admit_unknown_thread(notif.tid);
            }

            let result = {
                let mut ctx = HandlerContext {
                    registry: &mut self.registry,
                    overlay: &self.overlay,
                    memory: &self.memory,
                    started_at: Instant::now(),
                    time_scaling: self.config.time_scaling,
                };
                Dispatcher::dispatch(&mut ctx, &notif)
            };

            let response = match result {
                HandlerResult::Continue => Response::Continue,
                HandlerResult::Success(v) => Response::Value(v),
                HandlerResult::Error(e) => Response::Error(e),
            };

            if let Err(e) = notify::send(self.listener.as_fd(), notif.id, response) {
                tracing::warn!(id = notif.id, error = %e, "reply failed, notification likely stale");
            }
        }

        self.overlay.destroy();
        self.child
            .wait()
            .map_err(|e| BvisorError::Internal(format!("waiting on guest: {e}")))
    }

    /// Best-effort admission for a thread observed before its parent's
    /// `clone` trap was processed (spec §5 "handlers must therefore
    /// tolerate observing a child's syscall before the parent's clone-trap
    /// has been processed").
    fn admit_unknown_thread(&mut self, tid: AbsTid) {
        let Some(parent) = read_ppid(tid) else {
            tracing::warn!(tid = tid.get(), "unknown thread with no resolvable parent");
            return;
        };
        if !self.registry.contains(parent) {
            tracing::warn!(tid = tid.get(), parent = parent.get(), "unknown thread's parent is also unknown");
            return;
        }
        if let Err(e) = self.registry.sync_new_threads(parent, tid) {
            tracing::warn!(tid = tid.get(), error = ?e, "failed to admit unknown thread");
        }
    }

    /// Tear down the overlay without running the receive loop; used when an
    /// error aborts the guest before `run` is called.
    pub fn shutdown(self) {
        self.overlay.destroy();
    }
}

fn read_ppid(tid: AbsTid) -> Option<AbsTid> {
    let status = fs::read_to_string(format!("/proc/{}/status", tid.get())).ok()?;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("PPid:") {
            return rest.trim().parse::<i32>().ok().map(AbsTid);
        }
    }
    None
}
