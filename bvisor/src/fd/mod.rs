//! Virtual file-descriptor table and the tagged file handle it owns.

pub mod handle;
pub mod table;

pub use handle::{CowMode, FileHandle, FileStat};
pub use table::{FdTable, SharedHandle, VirtualFd};
