pub mod config;
pub mod embedding;
pub mod enroll;
pub mod error;
pub mod matcher;
pub mod recognize;
pub mod store;

// Re-export vision types for convenience
pub use ridgeid_vision::{
    preprocess, Extractor, FingerprintEmbedder, ModelKind, ModelPair, ModelSource,
    OperatorRegistry, Segmenter,
};

pub use embedding::Embedding;
pub use matcher::MatchResult;
pub use store::ReferenceStore;
