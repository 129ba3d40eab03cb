//! Typed failure surfaces of the recognition and enrollment flows.

use std::path::PathBuf;

use thiserror::Error;

use ridgeid_vision::{ModelError, PipelineError};

use crate::store::StoreError;

/// Everything a single recognition call can fail with.
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no fingerprint references are enrolled")]
    EmptyDatabase,
    #[error("employee {0:?} is not enrolled")]
    UnknownEmployee(String),
    #[error("embedding collapsed to zero norm")]
    DegenerateEmbedding,
}

/// Failures that abort an entire enrollment run. Per-sample failures are
/// logged and counted in the summary instead of surfacing here.
#[derive(Debug, Error)]
pub enum EnrollError {
    #[error("cannot read dataset directory {}", .path.display())]
    Dataset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no employee references produced from {}", .path.display())]
    NothingEnrolled { path: PathBuf },
}
