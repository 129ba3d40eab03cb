//! Full pass: image → ridge mask → masked resize → raw embedding.

use std::path::Path;

use image::GrayImage;

use crate::embed::Extractor;
use crate::error::{ModelError, PipelineError};
use crate::model::ModelSource;
use crate::preprocess;
use crate::segment::Segmenter;

/// Segmentation and recognition models loaded as one unit.
///
/// A pair is loaded per invocation and dropped afterwards; a bad artifact
/// only poisons the call that loaded it.
pub struct ModelPair {
    pub segmenter: Segmenter,
    pub extractor: Extractor,
}

impl ModelPair {
    pub fn load(
        source: &ModelSource,
        segmentation: &str,
        recognition: &str,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            segmenter: Segmenter::load(source, segmentation)?,
            extractor: Extractor::load(source, recognition)?,
        })
    }
}

/// Anything that turns a fingerprint image into a raw, unnormalized
/// embedding vector.
pub trait FingerprintEmbedder {
    fn embed_image(&mut self, image: &GrayImage) -> Result<Vec<f32>, PipelineError>;

    /// Embed an image file; decoding failures surface before any inference.
    fn embed_file(&mut self, path: &Path) -> Result<Vec<f32>, PipelineError> {
        let image = preprocess::load_grayscale(path)?;
        self.embed_image(&image)
    }

    /// Embed an already-read image buffer without touching the filesystem.
    fn embed_bytes(&mut self, bytes: &[u8]) -> Result<Vec<f32>, PipelineError> {
        let image = preprocess::decode_grayscale(bytes)?;
        self.embed_image(&image)
    }
}

impl FingerprintEmbedder for ModelPair {
    fn embed_image(&mut self, image: &GrayImage) -> Result<Vec<f32>, PipelineError> {
        let tensor =
            preprocess::prepare(image, &mut self.segmenter, self.extractor.input_shape())?;
        Ok(self.extractor.extract(tensor)?)
    }
}
