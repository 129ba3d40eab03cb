use std::path::PathBuf;

use thiserror::Error;

use crate::model::ModelKind;

/// Failures while resolving or loading model artifacts.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{kind} model {name:?} not found at {}", .path.display())]
    NotFound {
        kind: ModelKind,
        name: String,
        path: PathBuf,
    },
    #[error("failed to load {kind} model {name:?}")]
    Load {
        kind: ModelKind,
        name: String,
        #[source]
        source: ort::Error,
    },
    #[error("{kind} model {name:?} has an unusable input signature: {reason}")]
    InputSignature {
        kind: ModelKind,
        name: String,
        reason: String,
    },
    #[error("recognition model {name:?} declares no embedding output")]
    NoEmbeddingOutput { name: String },
    #[error("no custom operator hook registered under {0:?}")]
    UnknownOperator(String),
    #[error("cannot list {kind} models under {}", .path.display())]
    List {
        kind: ModelKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while turning an image into a model-ready tensor.
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("cannot read fingerprint image {}", .path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("cannot decode fingerprint image from {len} bytes")]
    ImageDecode {
        len: usize,
        #[source]
        source: image::ImageError,
    },
    #[error("segmentation inference failed")]
    Segmentation(#[source] ort::Error),
    #[error("segmentation output holds {got} values, cannot form a {height}x{width} mask")]
    MaskShape { got: usize, height: u32, width: u32 },
    #[error("tensor layout error")]
    Tensor(#[from] ndarray::ShapeError),
}

/// Failures while extracting an embedding from the recognition model.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding inference failed")]
    Inference(#[source] ort::Error),
    #[error("recognition model produced no {output:?} tensor")]
    MissingOutput { output: String },
    #[error("embedding output has an unexpected element type")]
    OutputType(#[source] ort::Error),
    #[error("embedding output is empty")]
    EmptyOutput,
}

/// Union of the failures a full image-to-embedding pass can hit.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error(transparent)]
    Embed(#[from] EmbedError),
}
