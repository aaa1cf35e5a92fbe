//! Domain types and the storage port the application layer depends on.

pub mod ports;
pub mod wallet;
