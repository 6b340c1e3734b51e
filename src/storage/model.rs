//! Storage model types.

use rkyv::{Archive, Deserialize, Serialize};

/// One embedding matrix persisted to a slot file.
///
/// Stored as `rkyv` bytes and read back through a memory map.
///
/// # Example
/// ```rust
/// use moonwalk::storage::EmbeddingRecord;
///
/// let record = EmbeddingRecord::from_f32("txt", 1, 2, &[0.6, 0.8]);
/// assert_eq!(record.values(), vec![0.6, 0.8]);
/// ```
#[derive(Archive, Deserialize, Serialize, Debug, PartialEq, Clone)]
pub struct EmbeddingRecord {
    /// Slot key the record was written under.
    pub slot: String,
    /// Number of rows (clips for video, 1 for text).
    pub rows: u32,
    /// Values per row.
    pub dim: u32,
    /// Row-major values as native-endian f32 bytes.
    pub data: Vec<u8>,
}

impl EmbeddingRecord {
    /// Packs an f32 matrix.
    pub fn from_f32(slot: &str, rows: usize, dim: usize, values: &[f32]) -> Self {
        Self {
            slot: slot.to_string(),
            rows: rows as u32,
            dim: dim as u32,
            data: bytemuck::cast_slice(values).to_vec(),
        }
    }

    /// Unpacks the values (alignment-safe copy).
    pub fn values(&self) -> Vec<f32> {
        bytemuck::pod_collect_to_vec(&self.data)
    }
}
