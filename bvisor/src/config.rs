//! Supervisor configuration (SPEC_FULL.md §0).

use std::path::PathBuf;

/// Knobs that don't belong in the core spec but every real invocation needs.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Parent directory the overlay root is created under.
    pub overlay_parent: PathBuf,
    /// Experimental `clock_nanosleep` scaling factor (SPEC_FULL.md §9(c)).
    /// `None` (the default) passes sleeps through unmodified.
    pub time_scaling: Option<f64>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            overlay_parent: PathBuf::from("/tmp/.bvisor"),
            time_scaling: None,
        }
    }
}
