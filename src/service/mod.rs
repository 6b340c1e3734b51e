//! The moment retrieval service.
//!
//! [`MomentService`] owns the long-lived model resources and the current video.
//! Every use of the models goes through one inference lock: a query batch
//! holds it from the first query to the last, and video extraction holds it
//! while embedding. Lock order is always inference lock, then video lock.

mod error;
mod query;

#[cfg(test)]
mod tests;

pub use error::ServiceError;
pub use query::{QueryContext, run_sequential, split_queries};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{Instrument, debug, info, instrument, warn};

use crate::config::{Config, SelectionPolicy};
use crate::decoding::QueryResult;
use crate::embedding::{FeatureExtractor, TextEmbedder, VideoEmbedder, VideoEmbedding};
use crate::grounding::{GroundingEngine, GroundingError, GroundingModel};
use crate::storage::{EmbeddingStore, Slot, StorageError};

/// Process-level knobs the service needs after startup.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub clip_len: f32,
    pub video_dir: PathBuf,
    pub video_extensions: Vec<String>,
    pub selection_policy: SelectionPolicy,
    /// Mirror each query embedding into the "txt" slot.
    pub persist_text: bool,
    /// Where uploaded videos are written before extraction.
    pub upload_path: PathBuf,
    /// Loaded grounding checkpoint (reported by readiness).
    pub checkpoint: Option<PathBuf>,
}

impl ServiceSettings {
    pub fn from_config(config: &Config, checkpoint: Option<PathBuf>) -> Self {
        Self {
            clip_len: config.clip_len,
            video_dir: config.video_dir.clone(),
            video_extensions: config.video_extensions.clone(),
            selection_policy: config.selection_policy,
            persist_text: config.persist_text,
            upload_path: config.upload_path(),
            checkpoint,
        }
    }
}

/// Summary of the currently loaded video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VideoStatus {
    pub clips: usize,
    pub dim: usize,
    pub duration_secs: f32,
}

impl VideoStatus {
    fn of(video: &VideoEmbedding, clip_len: f32) -> Self {
        Self {
            clips: video.ctx_len(),
            dim: video.dim(),
            duration_secs: video.duration_secs(clip_len),
        }
    }
}

/// Explicitly constructed service object shared by all requests.
pub struct MomentService {
    extractor: Arc<dyn FeatureExtractor>,
    engine: GroundingEngine,
    store: EmbeddingStore,
    video_embedder: VideoEmbedder,
    text_embedder: TextEmbedder,
    settings: ServiceSettings,
    inference_lock: Arc<Mutex<()>>,
    video: Arc<RwLock<Option<Arc<VideoEmbedding>>>>,
}

impl std::fmt::Debug for MomentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MomentService")
            .field("engine", &self.engine)
            .field("store", &self.store.root())
            .field("settings", &self.settings)
            .finish()
    }
}

impl MomentService {
    pub fn new(
        extractor: Arc<dyn FeatureExtractor>,
        model: Arc<dyn GroundingModel>,
        store: EmbeddingStore,
        settings: ServiceSettings,
    ) -> Self {
        let engine = GroundingEngine::new(model, settings.clip_len);
        let video_embedder = VideoEmbedder::new(extractor.clone(), store.clone());
        let mut text_embedder = TextEmbedder::new(extractor.clone());
        if settings.persist_text {
            text_embedder = text_embedder.with_store(store.clone());
        }

        Self {
            extractor,
            engine,
            store,
            video_embedder,
            text_embedder,
            settings,
            inference_lock: Arc::new(Mutex::new(())),
            video: Arc::new(RwLock::new(None)),
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn store(&self) -> &EmbeddingStore {
        &self.store
    }

    pub fn extractor_is_stub(&self) -> bool {
        self.extractor.is_stub()
    }

    /// Loads the persisted video slot, if any, as the current video.
    ///
    /// An absent slot is normal on first start. A corrupt one is logged and
    /// ignored so the service still comes up.
    pub async fn restore_video(&self) -> Result<Option<VideoStatus>, ServiceError> {
        let store = self.store.clone();
        let loaded = tokio::task::spawn_blocking(move || store.load_video()).await?;

        let video = match loaded {
            Ok(video) => video,
            Err(StorageError::NotFound { .. }) => {
                debug!("No persisted video to restore");
                return Ok(None);
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable persisted video");
                return Ok(None);
            }
        };

        let status = VideoStatus::of(&video, self.settings.clip_len);
        *self.video.write().await = Some(Arc::new(video));
        info!(clips = status.clips, "Restored persisted video embedding");
        Ok(Some(status))
    }

    /// Current video summary, if one is loaded.
    pub async fn video_status(&self) -> Option<VideoStatus> {
        self.video
            .read()
            .await
            .as_deref()
            .map(|v| VideoStatus::of(v, self.settings.clip_len))
    }

    /// Embeds `path`, persists it, and makes it the current video.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn extract_video(&self, path: &Path) -> Result<VideoStatus, ServiceError> {
        let path = path.to_path_buf();
        let ((), status) = self
            .run_extraction(move |embedder| Ok(((), embedder.embed_file(&path)?)))
            .await?;
        Ok(status)
    }

    /// Writes an uploaded video to the upload path and extracts it.
    ///
    /// The write happens under the inference lock so concurrent uploads cannot
    /// replace the file while another extraction reads it.
    #[instrument(skip_all, fields(bytes = data.as_ref().len()))]
    pub async fn extract_upload<B>(&self, data: B) -> Result<VideoStatus, ServiceError>
    where
        B: AsRef<[u8]> + Send + 'static,
    {
        let path = self.settings.upload_path.clone();
        let ((), status) = self
            .run_extraction(move |embedder| {
                save_upload(&path, data.as_ref())?;
                Ok(((), embedder.embed_file(&path)?))
            })
            .await?;
        Ok(status)
    }

    /// Resolves a video from the configured directory and extracts it.
    #[instrument(skip(self))]
    pub async fn extract_from_dir(&self) -> Result<(PathBuf, VideoStatus), ServiceError> {
        let dir = self.settings.video_dir.clone();
        let extensions = self.settings.video_extensions.clone();
        let policy = self.settings.selection_policy;

        self.run_extraction(move |embedder| {
            Ok(embedder.embed_from_dir(&dir, &extensions, policy)?)
        })
        .await
    }

    /// Runs `job` under the inference lock, then installs the video it produced.
    ///
    /// Once the lock is held the work runs on a detached task, so dropping the
    /// caller's future cannot leave the "vid" slot persisted but not installed.
    async fn run_extraction<T, F>(&self, job: F) -> Result<(T, VideoStatus), ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&VideoEmbedder) -> Result<(T, VideoEmbedding), ServiceError> + Send + 'static,
    {
        let guard = self.inference_lock.clone().lock_owned().await;
        let embedder = self.video_embedder.clone();
        let current = self.video.clone();
        let clip_len = self.settings.clip_len;

        let task = tokio::spawn(
            async move {
                let (value, video) =
                    tokio::task::spawn_blocking(move || job(&embedder)).await??;
                let status = install_video(&current, video, clip_len).await;
                drop(guard);
                Ok::<_, ServiceError>((value, status))
            }
            .in_current_span(),
        );

        task.await?
    }

    /// Splits `raw` on `;` and runs the non-empty parts as one batch.
    pub async fn run_queries(&self, raw: &str) -> Result<Vec<QueryResult>, ServiceError> {
        let queries = split_queries(raw);
        if queries.is_empty() {
            return Err(ServiceError::EmptyQuery);
        }
        self.run_batch(queries).await
    }

    /// Runs `queries` in order under the inference lock. Fail-fast.
    #[instrument(skip_all, fields(batch = queries.len()))]
    pub async fn run_batch(&self, queries: Vec<String>) -> Result<Vec<QueryResult>, ServiceError> {
        if queries.is_empty() {
            return Err(ServiceError::EmptyQuery);
        }

        let inference = self.inference_lock.clone().lock_owned().await;
        let video_guard = self.video.clone().read_owned().await;
        let video = (*video_guard).clone().ok_or(GroundingError::MissingEmbedding {
            slot: Slot::Video.key(),
            reason: "no video has been extracted".to_string(),
        })?;

        let embedder = self.text_embedder.clone();
        let engine = self.engine.clone();

        let results = tokio::task::spawn_blocking(move || {
            let _held = (inference, video_guard);
            run_sequential(&queries, &embedder, &engine, &video)
        })
        .await??;

        debug!(results = results.len(), "Query batch complete");
        Ok(results)
    }
}

/// Swaps the current video. Callers hold the inference lock.
async fn install_video(
    current: &RwLock<Option<Arc<VideoEmbedding>>>,
    video: VideoEmbedding,
    clip_len: f32,
) -> VideoStatus {
    let status = VideoStatus::of(&video, clip_len);
    *current.write().await = Some(Arc::new(video));
    info!(clips = status.clips, dim = status.dim, "Current video replaced");
    status
}

fn save_upload(path: &Path, data: &[u8]) -> Result<(), ServiceError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| ServiceError::UploadFailed {
            path: path.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, data).map_err(|source| ServiceError::UploadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = data.len(), "Upload saved");
    Ok(())
}
