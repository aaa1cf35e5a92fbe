//! Storage adapters implementing [`crate::domain::ports::WalletStore`].

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
