pub mod clahe;
pub mod embed;
pub mod error;
pub mod model;
pub mod ops;
pub mod pipeline;
pub mod preprocess;
pub mod segment;

// Re-export commonly used types
pub use embed::Extractor;
pub use error::{EmbedError, ModelError, PipelineError, PreprocessError};
pub use model::{ModelKind, ModelSource};
pub use ops::OperatorRegistry;
pub use pipeline::{FingerprintEmbedder, ModelPair};
pub use segment::Segmenter;
