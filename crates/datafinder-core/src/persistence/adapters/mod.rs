//! Built-in backend adapters.

pub mod filesystem;
pub mod memory;
pub mod null;
#[cfg(feature = "sqlite")]
pub mod sqlite;
