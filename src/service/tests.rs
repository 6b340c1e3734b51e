use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use super::*;
use crate::constants::CLIP_EMBEDDING_DIM;
use crate::embedding::{ClipConfig, ClipExtractor, EmbeddingError, TextEmbedding};
use crate::grounding::MockGroundingModel;

fn settings(video_dir: &Path, persist_text: bool) -> ServiceSettings {
    ServiceSettings {
        clip_len: 2.0,
        video_dir: video_dir.to_path_buf(),
        video_extensions: vec!["mp4".to_string()],
        selection_policy: SelectionPolicy::FirstSorted,
        persist_text,
        upload_path: video_dir.with_file_name("uploads").join("temp_video.mp4"),
        checkpoint: None,
    }
}

fn service_with(model: MockGroundingModel, dir: &TempDir, persist_text: bool) -> MomentService {
    let extractor =
        Arc::new(ClipExtractor::load(ClipConfig::stub().with_stub_clip_count(8)).unwrap());
    MomentService::new(
        extractor,
        Arc::new(model),
        EmbeddingStore::new(dir.path().join("embeddings")),
        settings(&dir.path().join("footages"), persist_text),
    )
}

/// One clip per byte of the input file, after a fixed delay.
struct SizedExtractor {
    delay: Duration,
}

impl FeatureExtractor for SizedExtractor {
    fn embed_video(&self, path: &Path) -> Result<VideoEmbedding, EmbeddingError> {
        let len = std::fs::metadata(path)
            .map_err(|_| EmbeddingError::VideoNotFound {
                path: path.to_path_buf(),
            })?
            .len() as usize;
        std::thread::sleep(self.delay);
        let mut row = vec![0.0; CLIP_EMBEDDING_DIM];
        row[0] = 1.0;
        VideoEmbedding::from_rows(vec![row; len])
    }

    fn embed_text(&self, _text: &str) -> Result<TextEmbedding, EmbeddingError> {
        let mut v = vec![0.0; CLIP_EMBEDDING_DIM];
        v[0] = 1.0;
        TextEmbedding::new(v)
    }

    fn embedding_dim(&self) -> usize {
        CLIP_EMBEDDING_DIM
    }
}

fn service(dir: &TempDir) -> MomentService {
    service_with(MockGroundingModel::new(CLIP_EMBEDDING_DIM), dir, true)
}

fn write_video(dir: &TempDir, name: &str) -> PathBuf {
    let footages = dir.path().join("footages");
    std::fs::create_dir_all(&footages).unwrap();
    let path = footages.join(name);
    std::fs::write(&path, name.as_bytes()).unwrap();
    path
}

#[test]
fn test_split_queries() {
    assert_eq!(split_queries("a ; b;  c "), vec!["a", "b", "c"]);
    assert_eq!(split_queries("single"), vec!["single"]);
    assert!(split_queries("").is_empty());
    assert!(split_queries("   ;  ;").is_empty());
}

#[tokio::test]
async fn test_empty_batch_is_validation_error() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    let err = service.run_queries("  ; ;").await.unwrap_err();
    assert!(matches!(err, ServiceError::EmptyQuery));
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_query_without_video_is_missing_embedding() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    let err = service.run_queries("a cat").await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Grounding(GroundingError::MissingEmbedding { slot: "vid", .. })
    ));
    assert!(!err.is_validation());
}

#[tokio::test]
async fn test_extract_then_query_preserves_order() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    let video = write_video(&dir, "clip.mp4");

    let status = service.extract_video(&video).await.unwrap();
    assert_eq!(status.clips, 8);
    assert_eq!(status.duration_secs, 16.0);
    assert!(service.store().exists(Slot::Video));

    let results = service
        .run_queries("first thing; second thing ;third thing")
        .await
        .unwrap();
    let queries: Vec<&str> = results.iter().map(|r| r.query.as_str()).collect();
    assert_eq!(queries, vec!["first thing", "second thing", "third thing"]);
    for result in &results {
        assert_eq!(result.interval.len(), "00:00:00 - 00:00:00".len());
        assert_eq!(result.highlight.len(), "00:00:00".len());
    }
}

#[tokio::test]
async fn test_persist_text_controls_text_slot() {
    let dir = TempDir::new().unwrap();
    let video = write_video(&dir, "clip.mp4");

    let persisting = service(&dir);
    persisting.extract_video(&video).await.unwrap();
    persisting.run_queries("a sunset").await.unwrap();
    assert!(persisting.store().exists(Slot::Text));

    let other = TempDir::new().unwrap();
    let video = write_video(&other, "clip.mp4");
    let in_memory = service_with(MockGroundingModel::new(CLIP_EMBEDDING_DIM), &other, false);
    in_memory.extract_video(&video).await.unwrap();
    in_memory.run_queries("a sunset").await.unwrap();
    assert!(!in_memory.store().exists(Slot::Text));
}

#[tokio::test]
async fn test_batch_fails_fast_naming_query() {
    let dir = TempDir::new().unwrap();
    let model = MockGroundingModel::new(CLIP_EMBEDDING_DIM).failing();
    let service = service_with(model, &dir, false);
    service
        .extract_video(&write_video(&dir, "clip.mp4"))
        .await
        .unwrap();

    let err = service.run_queries("first; second").await.unwrap_err();
    match err {
        ServiceError::QueryFailed { query, source } => {
            assert_eq!(query, "first");
            assert!(matches!(
                *source,
                ServiceError::Grounding(GroundingError::InferenceFailure { .. })
            ));
        }
        other => panic!("expected QueryFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_restore_video_after_restart() {
    let dir = TempDir::new().unwrap();
    let video = write_video(&dir, "clip.mp4");

    let first = service(&dir);
    first.extract_video(&video).await.unwrap();
    drop(first);

    let restarted = service(&dir);
    assert!(restarted.video_status().await.is_none());
    let status = restarted.restore_video().await.unwrap();
    assert_eq!(status.map(|s| s.clips), Some(8));
    assert!(restarted.run_queries("anything").await.is_ok());
}

#[tokio::test]
async fn test_restore_video_without_slot() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    assert_eq!(service.restore_video().await.unwrap(), None);
}

#[tokio::test]
async fn test_restore_ignores_corrupt_slot() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    service.store().ensure_root().unwrap();
    std::fs::write(service.store().slot_path(Slot::Video), b"not an archive").unwrap();

    assert_eq!(service.restore_video().await.unwrap(), None);
    assert!(service.video_status().await.is_none());
}

#[tokio::test]
async fn test_extract_from_dir() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    let err = service.extract_from_dir().await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Embedding(EmbeddingError::NoVideoFound { .. })
    ));

    write_video(&dir, "b.mp4");
    let expected = write_video(&dir, "a.mp4");
    let (path, status) = service.extract_from_dir().await.unwrap();
    assert_eq!(path, expected);
    assert_eq!(status.clips, 8);
}

#[tokio::test]
async fn test_failed_extraction_keeps_current_video() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    service
        .extract_video(&write_video(&dir, "clip.mp4"))
        .await
        .unwrap();

    let err = service
        .extract_video(&dir.path().join("missing.mp4"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Embedding(EmbeddingError::VideoNotFound { .. })
    ));
    assert_eq!(service.video_status().await.map(|s| s.clips), Some(8));
}

#[tokio::test]
async fn test_extract_upload_writes_upload_path() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    let status = service.extract_upload(b"uploaded video".to_vec()).await.unwrap();
    assert_eq!(status.clips, 8);

    let saved = std::fs::read(&service.settings().upload_path).unwrap();
    assert_eq!(saved, b"uploaded video");
    assert!(service.store().exists(Slot::Video));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dropped_upload_still_installs_persisted_video() {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(MomentService::new(
        Arc::new(SizedExtractor {
            delay: Duration::from_millis(200),
        }),
        Arc::new(MockGroundingModel::new(CLIP_EMBEDDING_DIM)),
        EmbeddingStore::new(dir.path().join("embeddings")),
        settings(&dir.path().join("footages"), false),
    ));
    service.extract_upload(vec![0u8; 3]).await.unwrap();

    let pending = {
        let service = service.clone();
        tokio::spawn(async move { service.extract_upload(vec![0u8; 7]).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    pending.abort();
    assert!(pending.await.unwrap_err().is_cancelled());

    // The extraction keeps the inference lock until the swap is done.
    drop(service.inference_lock.lock().await);

    let on_disk = service.store().load_video().unwrap().ctx_len();
    assert_eq!(on_disk, 7);
    assert_eq!(service.video_status().await.map(|s| s.clips), Some(on_disk));
}
