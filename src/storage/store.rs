//! File-backed embedding slots.
//!
//! Layout: `<root>/vid.rkyv` and `<root>/txt.rkyv`. Every write is a full
//! overwrite through a temp file and an atomic rename.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use rkyv::rancor::Error as RkyvError;
use rkyv::to_bytes;
use tempfile::NamedTempFile;
use tracing::debug;

use super::error::{StorageError, StorageResult};
use super::mmap::{MappedSlot, MmapError};
use super::model::EmbeddingRecord;
use crate::constants::{TEXT_SLOT_KEY, VIDEO_SLOT_KEY};
use crate::embedding::{TextEmbedding, VideoEmbedding};

const RKYV_EXTENSION: &str = "rkyv";

/// The two persisted embedding slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Current video (`"vid"`).
    Video,
    /// Last query text (`"txt"`).
    Text,
}

impl Slot {
    /// On-disk key.
    pub fn key(self) -> &'static str {
        match self {
            Slot::Video => VIDEO_SLOT_KEY,
            Slot::Text => TEXT_SLOT_KEY,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A matrix read back from a slot.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMatrix {
    pub rows: usize,
    pub dim: usize,
    pub data: Vec<f32>,
}

#[derive(Debug, Clone)]
/// Reads and overwrites embedding slots under one root directory.
pub struct EmbeddingStore {
    root: PathBuf,
}

impl EmbeddingStore {
    /// Creates a store rooted at `root` (created lazily on first write).
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensures the root directory exists.
    pub fn ensure_root(&self) -> StorageResult<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(|_| StorageError::StorageUnavailable {
                path: self.root.clone(),
            })?;
        }
        Ok(())
    }

    /// Path of a slot file.
    pub fn slot_path(&self, slot: Slot) -> PathBuf {
        self.root.join(format!("{}.{}", slot.key(), RKYV_EXTENSION))
    }

    /// Returns `true` if the slot has been written.
    pub fn exists(&self, slot: Slot) -> bool {
        self.slot_path(slot).is_file()
    }

    /// Overwrites `slot` with a `[rows, dim]` matrix.
    pub fn write(
        &self,
        slot: Slot,
        rows: usize,
        dim: usize,
        values: &[f32],
    ) -> StorageResult<PathBuf> {
        if values.len() != rows * dim {
            return Err(StorageError::Malformed {
                slot: slot.key(),
                reason: format!(
                    "refusing to write {} values as [{rows}, {dim}]",
                    values.len()
                ),
            });
        }

        self.ensure_root()?;

        let record = EmbeddingRecord::from_f32(slot.key(), rows, dim, values);
        let bytes = to_bytes::<RkyvError>(&record)
            .map_err(|e| StorageError::Serialization(format!("{:?}", e)))?;

        let final_path = self.slot_path(slot);
        let mut temp = NamedTempFile::new_in(&self.root)?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&final_path).map_err(|e| StorageError::Io(e.error))?;

        debug!(slot = %slot, rows, dim, path = %final_path.display(), "Wrote embedding slot");
        Ok(final_path)
    }

    /// Reads `slot` back, validating the archive and its shape.
    pub fn read(&self, slot: Slot) -> StorageResult<StoredMatrix> {
        let path = self.slot_path(slot);
        if !path.is_file() {
            return Err(StorageError::NotFound { slot: slot.key() });
        }

        let malformed = |e: MmapError| StorageError::Malformed {
            slot: slot.key(),
            reason: e.to_string(),
        };
        let mapped = MappedSlot::open(&path).map_err(malformed)?;
        let archived = mapped.record().map_err(malformed)?;

        let rows = archived.rows.to_native() as usize;
        let dim = archived.dim.to_native() as usize;
        let bytes = archived.data.as_slice();

        if rows == 0 || dim == 0 {
            return Err(StorageError::Malformed {
                slot: slot.key(),
                reason: format!("empty shape [{rows}, {dim}]"),
            });
        }
        if bytes.len() != rows * dim * size_of::<f32>() {
            return Err(StorageError::Malformed {
                slot: slot.key(),
                reason: format!(
                    "{} bytes do not hold [{rows}, {dim}] f32 values",
                    bytes.len()
                ),
            });
        }

        Ok(StoredMatrix {
            rows,
            dim,
            data: bytemuck::pod_collect_to_vec(bytes),
        })
    }

    /// Removes a slot if present.
    pub fn clear(&self, slot: Slot) -> StorageResult<()> {
        let path = self.slot_path(slot);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Overwrites the video slot.
    pub fn save_video(&self, video: &VideoEmbedding) -> StorageResult<PathBuf> {
        self.write(Slot::Video, video.ctx_len(), video.dim(), video.as_slice())
    }

    /// Reads the video slot.
    pub fn load_video(&self) -> StorageResult<VideoEmbedding> {
        let matrix = self.read(Slot::Video)?;
        VideoEmbedding::new(matrix.rows, matrix.dim, matrix.data).map_err(|e| {
            StorageError::Malformed {
                slot: Slot::Video.key(),
                reason: e.to_string(),
            }
        })
    }

    /// Overwrites the text slot.
    pub fn save_text(&self, text: &TextEmbedding) -> StorageResult<PathBuf> {
        self.write(Slot::Text, 1, text.dim(), text.as_slice())
    }

    /// Reads the text slot; it must hold exactly one row.
    pub fn load_text(&self) -> StorageResult<TextEmbedding> {
        let matrix = self.read(Slot::Text)?;
        if matrix.rows != 1 {
            return Err(StorageError::Malformed {
                slot: Slot::Text.key(),
                reason: format!("expected 1 row, found {}", matrix.rows),
            });
        }
        TextEmbedding::new(matrix.data).map_err(|e| StorageError::Malformed {
            slot: Slot::Text.key(),
            reason: e.to_string(),
        })
    }
}
