//! Single-fingerprint recognition against the persisted reference store.

use std::path::Path;

use log::debug;

use ridgeid_vision::{FingerprintEmbedder, ModelPair, ModelSource};

use crate::embedding::Embedding;
use crate::error::RecognitionError;
use crate::matcher::{self, MatchResult};
use crate::store::ReferenceStore;

/// Recognize a fingerprint image file.
///
/// The store is re-read from disk on every call and the empty-store check
/// runs before any image work, so a misconfigured deployment fails fast
/// instead of burning inference time.
pub fn recognize_path(
    embedder: &mut dyn FingerprintEmbedder,
    store_path: &Path,
    image: &Path,
    threshold: f32,
    target: Option<&str>,
) -> Result<MatchResult, RecognitionError> {
    let store = loaded_store(store_path)?;
    let raw = embedder.embed_file(image)?;
    finish(&store, raw, threshold, target)
}

/// Recognize an in-memory image buffer, for callers that already hold the
/// upload and have no reason to spill it to disk.
pub fn recognize_bytes(
    embedder: &mut dyn FingerprintEmbedder,
    store_path: &Path,
    image: &[u8],
    threshold: f32,
    target: Option<&str>,
) -> Result<MatchResult, RecognitionError> {
    let store = loaded_store(store_path)?;
    let raw = embedder.embed_bytes(image)?;
    finish(&store, raw, threshold, target)
}

/// One-shot recognition: load fresh model sessions for this call only, then
/// run the file-based flow. The store is checked first so an empty
/// deployment fails before any session is built.
pub fn recognize_with_models(
    source: &ModelSource,
    segmentation: &str,
    recognition: &str,
    store_path: &Path,
    image: &Path,
    threshold: f32,
    target: Option<&str>,
) -> Result<MatchResult, RecognitionError> {
    let store = loaded_store(store_path)?;
    let mut pair = ModelPair::load(source, segmentation, recognition)?;
    let raw = pair.embed_file(image)?;
    finish(&store, raw, threshold, target)
}

fn loaded_store(store_path: &Path) -> Result<ReferenceStore, RecognitionError> {
    let store = ReferenceStore::load(store_path)?;
    if store.is_empty() {
        return Err(RecognitionError::EmptyDatabase);
    }
    debug!("loaded {} reference(s)", store.len());
    Ok(store)
}

fn finish(
    store: &ReferenceStore,
    raw: Vec<f32>,
    threshold: f32,
    target: Option<&str>,
) -> Result<MatchResult, RecognitionError> {
    let query = Embedding::from_raw(raw)?;
    matcher::match_query(store, &query, threshold, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use ridgeid_vision::{PipelineError, PreprocessError};
    use tempfile::TempDir;

    struct MeanPixelEmbedder {
        calls: usize,
    }

    impl FingerprintEmbedder for MeanPixelEmbedder {
        fn embed_image(&mut self, image: &GrayImage) -> Result<Vec<f32>, PipelineError> {
            self.calls += 1;
            let sum: f32 = image.as_raw().iter().map(|&v| v as f32).sum();
            Ok(vec![sum / image.as_raw().len() as f32, 10.0])
        }
    }

    struct ZeroEmbedder;

    impl FingerprintEmbedder for ZeroEmbedder {
        fn embed_image(&mut self, _image: &GrayImage) -> Result<Vec<f32>, PipelineError> {
            Ok(vec![0.0; 8])
        }
    }

    fn store_with(entries: &[(&str, Vec<f32>)], path: &Path) {
        let mut store = ReferenceStore::new();
        for (id, raw) in entries {
            store.upsert(id, Embedding::from_raw(raw.clone()).unwrap());
        }
        store.persist(path).unwrap();
    }

    fn png_bytes(value: u8) -> Vec<u8> {
        let img = GrayImage::from_pixel(4, 4, Luma([value]));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_recognize_path_end_to_end() {
        let dir = TempDir::new().unwrap();
        let store_path = dir.path().join("references.bin");
        store_with(&[("E1", vec![50.0, 10.0]), ("E2", vec![200.0, 10.0])], &store_path);

        let image_path = dir.path().join("query.png");
        GrayImage::from_pixel(4, 4, Luma([200]))
            .save(&image_path)
            .unwrap();

        let mut embedder = MeanPixelEmbedder { calls: 0 };
        let result = recognize_path(&mut embedder, &store_path, &image_path, 0.9, None).unwrap();

        assert_eq!(result.employee_id.as_deref(), Some("E2"));
        assert!(result.matched);
        assert!(result.confidence > 0.99);
    }

    #[test]
    fn test_recognize_bytes_matches_path_variant() {
        let dir = TempDir::new().unwrap();
        let store_path = dir.path().join("references.bin");
        store_with(&[("E1", vec![50.0, 10.0])], &store_path);

        let mut embedder = MeanPixelEmbedder { calls: 0 };
        let result =
            recognize_bytes(&mut embedder, &store_path, &png_bytes(50), 0.9, Some("E1")).unwrap();

        assert_eq!(result.employee_id.as_deref(), Some("E1"));
        assert!(result.matched);
    }

    #[test]
    fn test_empty_store_fails_before_embedding() {
        let dir = TempDir::new().unwrap();
        let store_path = dir.path().join("references.bin");
        let image_path = dir.path().join("query.png");
        GrayImage::from_pixel(4, 4, Luma([50]))
            .save(&image_path)
            .unwrap();

        let mut embedder = MeanPixelEmbedder { calls: 0 };
        let err =
            recognize_path(&mut embedder, &store_path, &image_path, 0.9, None).unwrap_err();

        assert!(matches!(err, RecognitionError::EmptyDatabase));
        assert_eq!(embedder.calls, 0);
    }

    #[test]
    fn test_unreadable_image_fails_before_inference() {
        let dir = TempDir::new().unwrap();
        let store_path = dir.path().join("references.bin");
        store_with(&[("E1", vec![50.0, 10.0])], &store_path);

        let image_path = dir.path().join("query.png");
        std::fs::write(&image_path, b"not an image").unwrap();

        let mut embedder = MeanPixelEmbedder { calls: 0 };
        let err =
            recognize_path(&mut embedder, &store_path, &image_path, 0.9, None).unwrap_err();

        assert!(matches!(
            err,
            RecognitionError::Pipeline(PipelineError::Preprocess(PreprocessError::ImageLoad {
                ..
            }))
        ));
        assert_eq!(embedder.calls, 0);
    }

    #[test]
    fn test_degenerate_query_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store_path = dir.path().join("references.bin");
        store_with(&[("E1", vec![50.0, 10.0])], &store_path);

        let mut embedder = ZeroEmbedder;
        let err =
            recognize_bytes(&mut embedder, &store_path, &png_bytes(13), 0.9, None).unwrap_err();
        assert!(matches!(err, RecognitionError::DegenerateEmbedding));
    }

    #[test]
    fn test_one_shot_reports_missing_models() {
        use ridgeid_vision::ModelError;

        let dir = TempDir::new().unwrap();
        let store_path = dir.path().join("references.bin");
        store_with(&[("E1", vec![50.0, 10.0])], &store_path);

        let image_path = dir.path().join("query.png");
        GrayImage::from_pixel(4, 4, Luma([50]))
            .save(&image_path)
            .unwrap();

        let source = ModelSource::new(dir.path().join("models"));
        let err = recognize_with_models(
            &source,
            "unet_segmentation_v1_0",
            "siamese_network_v1_0",
            &store_path,
            &image_path,
            0.9,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RecognitionError::Model(ModelError::NotFound { .. })
        ));
    }

    #[test]
    fn test_one_shot_empty_store_wins_over_missing_models() {
        let dir = TempDir::new().unwrap();
        let source = ModelSource::new(dir.path().join("models"));
        let err = recognize_with_models(
            &source,
            "unet_segmentation_v1_0",
            "siamese_network_v1_0",
            &dir.path().join("references.bin"),
            &dir.path().join("query.png"),
            0.9,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, RecognitionError::EmptyDatabase));
    }

    #[test]
    fn test_corrupt_store_surfaces_as_store_error() {
        let dir = TempDir::new().unwrap();
        let store_path = dir.path().join("references.bin");
        std::fs::write(&store_path, b"\xff\xff\xff\xff\xff\xff").unwrap();

        let mut embedder = MeanPixelEmbedder { calls: 0 };
        let err =
            recognize_bytes(&mut embedder, &store_path, &png_bytes(13), 0.9, None).unwrap_err();
        assert!(matches!(err, RecognitionError::Store(_)));
    }
}
