//! Embedding persistence (rkyv records behind memory-mapped slot files).

pub mod error;
pub mod mmap;
mod model;
mod store;

#[cfg(test)]
mod tests;

pub use error::{StorageError, StorageResult};
pub use model::{ArchivedEmbeddingRecord, EmbeddingRecord};
pub use store::{EmbeddingStore, Slot, StoredMatrix};
