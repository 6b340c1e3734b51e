//! Zero-copy read access to slot files.

pub mod error;

pub use error::{MmapError, MmapResult};

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use rkyv::rancor::Error as RkyvError;

use super::model::ArchivedEmbeddingRecord;

/// Alignment slot archives are written with.
pub const RKYV_ALIGNMENT: usize = 16;

/// A slot file mapped read-only for the duration of one load.
pub struct MappedSlot {
    map: Mmap,
}

impl std::fmt::Debug for MappedSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedSlot").field("len", &self.map.len()).finish()
    }
}

impl MappedSlot {
    /// Maps `path`. Empty files are rejected before mapping.
    pub fn open(path: &Path) -> MmapResult<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(MmapError::EmptyFile);
        }

        // SAFETY: slot files are replaced by rename and never written in place,
        // so the mapped inode does not change underneath us.
        let map = unsafe { Mmap::map(&file)? };
        Ok(Self { map })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Validates the archive and borrows the record header and payload.
    pub fn record(&self) -> MmapResult<&ArchivedEmbeddingRecord> {
        let bytes: &[u8] = &self.map;
        if !(bytes.as_ptr() as usize).is_multiple_of(RKYV_ALIGNMENT) {
            return Err(MmapError::AlignmentError {
                alignment: RKYV_ALIGNMENT,
            });
        }

        rkyv::access::<ArchivedEmbeddingRecord, RkyvError>(bytes)
            .map_err(|e| MmapError::ValidationFailed(e.to_string()))
    }
}
