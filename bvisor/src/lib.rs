//! Core supervisor library: everything that runs inside the bVisor process
//! once a guest has been launched (SPEC_FULL.md §0).

use std::path::Path;
use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bvisor_shared::BvisorResult;

pub mod bootstrap;
pub mod config;
pub mod dispatch;
pub mod errno;
pub mod fd;
pub mod fs;
pub mod memory;
pub mod notify;
pub mod ns;
pub mod supervisor;

pub use config::SupervisorConfig;
pub use supervisor::Supervisor;

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Install a daily-rotating file logger under `logs_dir`, falling back to
/// `RUST_LOG`/`info` filtering. Idempotent: later calls are no-ops, since a
/// global subscriber can only be installed once per process.
pub fn init_logging(logs_dir: &Path) -> BvisorResult<()> {
    std::fs::create_dir_all(logs_dir)?;

    let _ = LOG_GUARD.get_or_init(|| {
        let file_appender = tracing_appender::rolling::daily(logs_dir, "bvisor.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("info"))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        // Ignore the error: a host that already installed a subscriber
        // (e.g. a test harness) should keep using its own.
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
            .try_init();

        guard
    });

    Ok(())
}
