//! Error types used across the bVisor supervisor.

use thiserror::Error;

/// Result type for bVisor plumbing operations.
///
/// This is distinct from the guest-visible errno taxonomy in
/// `bvisor::errno::SysErr`: `BvisorError` covers supervisor-internal
/// failures (overlay creation, bootstrap, configuration) that never cross
/// the syscall-reply boundary.
pub type BvisorResult<T> = Result<T, BvisorError>;

#[derive(Debug, Error)]
pub enum BvisorError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("overlay error: {0}")]
    Overlay(String),

    #[error("bootstrap error: {0}")]
    Bootstrap(String),

    #[error("notification protocol error: {0}")]
    Notify(String),

    #[error("memory bridge error: {0}")]
    Memory(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for BvisorError {
    fn from(err: std::io::Error) -> Self {
        BvisorError::Internal(format!("I/O error: {}", err))
    }
}

impl From<nix::errno::Errno> for BvisorError {
    fn from(err: nix::errno::Errno) -> Self {
        BvisorError::Internal(format!("errno: {}", err))
    }
}

impl From<String> for BvisorError {
    fn from(err: String) -> Self {
        BvisorError::Internal(err)
    }
}

impl From<&str> for BvisorError {
    fn from(err: &str) -> Self {
        BvisorError::Internal(err.to_string())
    }
}
