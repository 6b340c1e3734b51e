use super::*;
use crate::embedding::{TextEmbedding, VideoEmbedding};
use std::fs;
use tempfile::TempDir;

fn create_test_store() -> (EmbeddingStore, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = EmbeddingStore::new(dir.path().join("embeddings"));
    (store, dir)
}

fn sample_video() -> VideoEmbedding {
    let rows: Vec<Vec<f32>> = (0..6)
        .map(|i| (0..4).map(|j| (i * 4 + j) as f32 * 0.125 - 1.0).collect())
        .collect();
    VideoEmbedding::from_rows(rows).unwrap()
}

#[test]
fn test_slot_keys_and_paths() {
    let (store, _dir) = create_test_store();
    assert_eq!(Slot::Video.key(), "vid");
    assert_eq!(Slot::Text.key(), "txt");
    assert!(store.slot_path(Slot::Video).ends_with("vid.rkyv"));
    assert!(store.slot_path(Slot::Text).ends_with("txt.rkyv"));
}

#[test]
fn test_video_round_trip_is_bit_identical() {
    let (store, _dir) = create_test_store();
    let video = sample_video();

    store.save_video(&video).expect("save video");
    assert!(store.exists(Slot::Video));

    let loaded = store.load_video().expect("load video");
    assert_eq!(loaded.ctx_len(), 6);
    assert_eq!(loaded.dim(), 4);
    let original_bits: Vec<u32> = video.as_slice().iter().map(|v| v.to_bits()).collect();
    let loaded_bits: Vec<u32> = loaded.as_slice().iter().map(|v| v.to_bits()).collect();
    assert_eq!(original_bits, loaded_bits);
}

#[test]
fn test_text_round_trip() {
    let (store, _dir) = create_test_store();
    let text = TextEmbedding::new(vec![0.6, 0.8, 0.0]).unwrap();

    store.save_text(&text).expect("save text");
    assert_eq!(store.load_text().expect("load text"), text);
}

#[test]
fn test_write_overwrites_previous_contents() {
    let (store, _dir) = create_test_store();

    store
        .save_text(&TextEmbedding::new(vec![1.0; 8]).unwrap())
        .unwrap();
    let replacement = TextEmbedding::new(vec![0.5, 0.5]).unwrap();
    store.save_text(&replacement).unwrap();

    assert_eq!(store.load_text().unwrap(), replacement);

    let leftovers: Vec<_> = fs::read_dir(store.root())
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(leftovers, vec!["txt.rkyv".to_string()]);
}

#[test]
fn test_read_missing_slot() {
    let (store, _dir) = create_test_store();
    assert!(matches!(
        store.load_video(),
        Err(StorageError::NotFound { slot: "vid" })
    ));
    assert!(matches!(
        store.load_text(),
        Err(StorageError::NotFound { slot: "txt" })
    ));
}

#[test]
fn test_read_corrupt_slot_is_malformed() {
    let (store, _dir) = create_test_store();
    store.ensure_root().unwrap();
    fs::write(store.slot_path(Slot::Video), b"definitely not an archive").unwrap();

    assert!(matches!(
        store.load_video(),
        Err(StorageError::Malformed { slot: "vid", .. })
    ));
}

#[test]
fn test_text_slot_with_many_rows_is_malformed() {
    let (store, _dir) = create_test_store();
    store.write(Slot::Text, 2, 2, &[1.0, 0.0, 0.0, 1.0]).unwrap();

    assert!(matches!(
        store.load_text(),
        Err(StorageError::Malformed { slot: "txt", .. })
    ));
}

#[test]
fn test_write_rejects_shape_mismatch() {
    let (store, _dir) = create_test_store();
    let result = store.write(Slot::Video, 3, 4, &[0.0; 5]);
    assert!(matches!(result, Err(StorageError::Malformed { .. })));
    assert!(!store.exists(Slot::Video));
}

#[test]
fn test_clear_slot() {
    let (store, _dir) = create_test_store();
    store.save_video(&sample_video()).unwrap();
    store.clear(Slot::Video).unwrap();
    assert!(!store.exists(Slot::Video));
    store.clear(Slot::Video).unwrap();
}
