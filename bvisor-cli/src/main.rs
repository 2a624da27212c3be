mod cli;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use bvisor::{Supervisor, SupervisorConfig};
use cli::Cli;

fn logs_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".bvisor")
        .join("logs")
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.debug {
        // SAFETY: called before any other thread is spawned.
        unsafe {
            std::env::set_var("RUST_LOG", "debug");
        }
    }

    if let Err(e) = bvisor::init_logging(&logs_dir()) {
        eprintln!("bvisor: failed to initialize logging: {e}");
    }

    let mut config = SupervisorConfig::default();
    if let Some(dir) = cli.overlay_dir {
        config.overlay_parent = dir;
    }

    let supervisor = match Supervisor::spawn(&cli.argv, config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("bvisor: failed to launch guest: {e}");
            return ExitCode::FAILURE;
        }
    };

    match supervisor.run() {
        Ok(status) => exit_code_for(status),
        Err(e) => {
            eprintln!("bvisor: supervisor error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Mirror the guest's exit status: its own exit code if it exited normally,
/// or 128+signal if it was killed by one (standard shell convention).
fn exit_code_for(status: std::process::ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;

    if let Some(code) = status.code() {
        ExitCode::from(code as u8)
    } else if let Some(signal) = status.signal() {
        ExitCode::from((128 + signal) as u8)
    } else {
        ExitCode::FAILURE
    }
}
