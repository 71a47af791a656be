//! Storage layer: the append-only per-contract memory log.

mod error;
pub use error::StoreError;

mod memory;
pub use memory::MemoryStore;
