//! Cross-cutting, shared constants.
//!
//! Prefer deriving secondary constants from primary ones to avoid drift.

/// Default clip duration in seconds (one embedding row per clip).
pub const DEFAULT_CLIP_LEN: f32 = 2.0;

/// Output dimension of the CLIP ViT-B/32 projection head.
pub const CLIP_EMBEDDING_DIM: usize = 512;

/// Square input resolution expected by the CLIP vision tower.
pub const CLIP_IMAGE_SIZE: usize = 224;

/// Max tokens accepted by the CLIP text tower.
pub const CLIP_MAX_SEQ_LEN: usize = 77;

/// Bytes in one sampled RGB24 frame.
pub const CLIP_FRAME_BYTES: usize = CLIP_IMAGE_SIZE * CLIP_IMAGE_SIZE * 3;

/// Frames encoded per vision forward pass.
pub const CLIP_FRAME_BATCH: usize = 32;

/// Per-channel pixel mean used by CLIP preprocessing.
pub const CLIP_PIXEL_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// Per-channel pixel std used by CLIP preprocessing.
pub const CLIP_PIXEL_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_1];

/// Number of temporal-extent feature channels appended to each clip.
pub const TEF_CHANNELS: usize = 2;

/// On-disk key of the current video embedding.
pub const VIDEO_SLOT_KEY: &str = "vid";

/// On-disk key of the last text embedding.
pub const TEXT_SLOT_KEY: &str = "txt";

/// Checkpoint file preferred over any other match in the checkpoint directory.
pub const CANONICAL_CHECKPOINT: &str = "model_raw.safetensors";

/// Extension used to discover checkpoint files.
pub const CHECKPOINT_EXTENSION: &str = "safetensors";

/// File name of the uploaded video inside the embeddings directory.
pub const UPLOAD_FILENAME: &str = "temp_video.mp4";

/// Separator between queries in a batch request.
pub const QUERY_SEPARATOR: char = ';';

/// Default upload cap (1 GiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

/// Clip count produced by the stub extractor for any video.
pub const DEFAULT_STUB_CLIP_COUNT: usize = 16;
