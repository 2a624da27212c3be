//! CLI definition and argument parsing for bvisor-cli.

use std::path::PathBuf;

use clap::Parser;

/// Run a command under the bVisor sandbox supervisor.
#[derive(Parser, Debug)]
#[command(name = "bvisor", author, version, about = "bVisor sandbox supervisor")]
pub struct Cli {
    /// Enable debug-level tracing (equivalent to RUST_LOG=debug).
    #[arg(long, global = true)]
    pub debug: bool,

    /// Directory the per-run overlay root is created under.
    #[arg(long, value_name = "DIR")]
    pub overlay_dir: Option<PathBuf>,

    /// The guest command and its arguments.
    #[arg(required = true, trailing_var_arg = true)]
    pub argv: Vec<String>,
}
