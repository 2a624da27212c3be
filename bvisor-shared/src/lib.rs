//! Types and errors shared between the `bvisor` core library and `bvisor-cli`.

pub mod errors;

pub use errors::{BvisorError, BvisorResult};
