//! Adapters behind the domain ports: storage, processor backends and history
//! sources.

pub mod history;
pub mod in_memory;
pub mod processors;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
