//! End-to-end literal scenarios, driven entirely through `Dispatcher` with a
//! synthetic notification stream (no real kernel or seccomp filter
//! involved). `MemoryMode::Local` lets guest addresses simply be
//! supervisor-local pointers.

use std::path::PathBuf;
use std::time::Instant;

use bvisor::dispatch::{Dispatcher, HandlerContext, HandlerResult};
use bvisor::fs::OverlayRoot;
use bvisor::memory::{MemoryBridge, MemoryMode};
use bvisor::notify::{Notification, SeccompData};
use bvisor::ns::{AbsTid, ThreadRegistry};
use nix::sched::CloneFlags;
use tempfile::TempDir;

// ============================================================================
// TEST FIXTURES
// ============================================================================

struct TestGuest {
    registry: ThreadRegistry,
    memory: MemoryBridge,
    _overlay_dir: TempDir,
    overlay: OverlayRoot,
}

impl TestGuest {
    fn new() -> Self {
        let registry = ThreadRegistry::register_initial(AbsTid(100), PathBuf::from("/"));
        let overlay_dir = TempDir::new().expect("overlay tempdir");
        let overlay = OverlayRoot::create_for_test(overlay_dir.path()).expect("overlay root");
        Self {
            registry,
            memory: MemoryBridge::new(MemoryMode::Local),
            _overlay_dir: overlay_dir,
            overlay,
        }
    }

    fn dispatch(&mut self, notif: &Notification) -> HandlerResult {
        let mut ctx = HandlerContext {
            registry: &mut self.registry,
            overlay: &self.overlay,
            memory: &self.memory,
            started_at: Instant::now(),
            time_scaling: None,
        };
        Dispatcher::dispatch(&mut ctx, notif)
    }
}

fn notif(tid: AbsTid, nr: i64, args: [u64; 6]) -> Notification {
    Notification {
        id: 1,
        tid,
        data: SeccompData {
            nr: nr as i32,
            arch: 0,
            instruction_pointer: 0,
            args,
        },
    }
}

fn write_guest_path(path: &str) -> (Vec<u8>, u64) {
    let mut bytes = path.as_bytes().to_vec();
    bytes.push(0);
    let addr = bytes.as_ptr() as u64;
    (bytes, addr)
}

// ============================================================================
// SCENARIO 1: BLOCKED DIRECTORY
// ============================================================================

#[test]
fn blocked_directory_open_is_eacces() {
    let mut guest = TestGuest::new();
    let (_buf, addr) = write_guest_path("/sys/class/net");

    let n = notif(AbsTid(100), libc::SYS_openat, [0, addr, libc::O_RDONLY as u64, 0, 0, 0]);
    match guest.dispatch(&n) {
        HandlerResult::Error(e) => assert_eq!(e, bvisor::errno::SysErr::Acces),
        other => panic!("unexpected result: {other:?}"),
    }
}

// ============================================================================
// SCENARIO 2: PRIVATE TMP
// ============================================================================

#[test]
fn private_tmp_write_then_reopen_round_trips() {
    let mut guest = TestGuest::new();
    let (_buf, path_addr) = write_guest_path("/tmp/foo");

    let open_flags = (libc::O_WRONLY | libc::O_CREAT) as u64;
    let open_n = notif(AbsTid(100), libc::SYS_openat, [0, path_addr, open_flags, 0o644, 0, 0]);
    let vfd = match guest.dispatch(&open_n) {
        HandlerResult::Success(vfd) => vfd as i32,
        other => panic!("unexpected open result: {other:?}"),
    };
    assert!(vfd >= 3);

    let payload = b"hello";
    let write_addr = payload.as_ptr() as u64;
    let write_n = notif(AbsTid(100), libc::SYS_write, [vfd as u64, write_addr, 5, 0, 0, 0]);
    match guest.dispatch(&write_n) {
        HandlerResult::Success(5) => {}
        other => panic!("unexpected write result: {other:?}"),
    }

    let close_n = notif(AbsTid(100), libc::SYS_close, [vfd as u64, 0, 0, 0, 0, 0]);
    assert!(matches!(guest.dispatch(&close_n), HandlerResult::Success(0)));

    let (_buf2, path_addr2) = write_guest_path("/tmp/foo");
    let reopen_n = notif(AbsTid(100), libc::SYS_openat, [0, path_addr2, libc::O_RDONLY as u64, 0, 0, 0]);
    let vfd2 = match guest.dispatch(&reopen_n) {
        HandlerResult::Success(vfd) => vfd as i32,
        other => panic!("unexpected reopen result: {other:?}"),
    };

    let mut read_buf = [0u8; 5];
    let read_addr = read_buf.as_mut_ptr() as u64;
    let read_n = notif(AbsTid(100), libc::SYS_read, [vfd2 as u64, read_addr, 5, 0, 0, 0]);
    match guest.dispatch(&read_n) {
        HandlerResult::Success(5) => {}
        other => panic!("unexpected read result: {other:?}"),
    }
    assert_eq!(&read_buf, b"hello");
}

// ============================================================================
// SCENARIO 3: PROC RENDERING
// ============================================================================

#[test]
fn proc_self_renders_ns_tid_then_eofs() {
    let mut guest = TestGuest::new();
    let (_buf, path_addr) = write_guest_path("/proc/self");

    let open_n = notif(AbsTid(100), libc::SYS_openat, [0, path_addr, libc::O_RDONLY as u64, 0, 0, 0]);
    let vfd = match guest.dispatch(&open_n) {
        HandlerResult::Success(vfd) => vfd as i32,
        other => panic!("unexpected open result: {other:?}"),
    };

    let mut buf = [0u8; 32];
    let addr = buf.as_mut_ptr() as u64;
    let read_n = notif(AbsTid(100), libc::SYS_read, [vfd as u64, addr, 32, 0, 0, 0]);
    match guest.dispatch(&read_n) {
        HandlerResult::Success(2) => {}
        other => panic!("unexpected first read: {other:?}"),
    }
    assert_eq!(&buf[..2], b"1\n");

    let second = notif(AbsTid(100), libc::SYS_read, [vfd as u64, addr, 32, 0, 0, 0]);
    assert!(matches!(guest.dispatch(&second), HandlerResult::Success(0)));
}

// ============================================================================
// SCENARIO 4: NAMESPACE ISOLATION
// ============================================================================

#[test]
fn namespaced_child_sees_no_parent_and_is_pid_one() {
    let mut guest = TestGuest::new();
    guest
        .registry
        .register_child(AbsTid(100), AbsTid(200), CloneFlags::CLONE_NEWPID)
        .unwrap();

    let getppid_n = notif(AbsTid(200), libc::SYS_getppid, [0; 6]);
    assert!(matches!(guest.dispatch(&getppid_n), HandlerResult::Success(0)));

    let getpid_n = notif(AbsTid(200), libc::SYS_getpid, [0; 6]);
    assert!(matches!(guest.dispatch(&getpid_n), HandlerResult::Success(1)));
}

// ============================================================================
// SCENARIO 6: KILL RESOLUTION
// ============================================================================

#[test]
fn kill_zero_tgid_is_einval() {
    let mut guest = TestGuest::new();
    let n = notif(AbsTid(100), libc::SYS_kill, [0, 9, 0, 0, 0, 0]);
    match guest.dispatch(&n) {
        HandlerResult::Error(e) => assert_eq!(e, bvisor::errno::SysErr::Inval),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn kill_resolves_ns_tgid_to_abs_tgid_and_reaches_the_real_process() {
    // A real, short-lived child stands in for "guest process 200": its host
    // pid is the `AbsTgid` the supervisor's resolution must land on before
    // issuing the real `kill(2)`.
    let mut child = std::process::Command::new("sleep")
        .arg("5")
        .spawn()
        .expect("spawn sleep");
    let child_tid = AbsTid(child.id() as i32);

    let mut guest = TestGuest::new();
    guest
        .registry
        .register_child(AbsTid(100), child_tid, CloneFlags::empty())
        .unwrap();
    // The child is the second thread admitted into the root namespace
    // (the initial thread took NsTid 1), so its NsTgid as seen by the root
    // caller is 2.
    let n = notif(AbsTid(100), libc::SYS_kill, [2, libc::SIGTERM as u64, 0, 0, 0, 0]);
    assert!(matches!(guest.dispatch(&n), HandlerResult::Success(0)));

    let status = child.wait().expect("wait for signalled child");
    assert!(!status.success());
}
