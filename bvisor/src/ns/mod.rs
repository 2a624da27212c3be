//! Thread and PID-namespace model (spec §3, §4.7).

pub mod ids;
pub mod namespace;
pub mod registry;
pub mod thread;

pub use ids::{AbsTgid, AbsTid, NsTgid, NsTid};
pub use namespace::{Namespace, NsKey};
pub use registry::ThreadRegistry;
pub use thread::Thread;
