//! Model artifact resolution and ONNX Runtime session construction.
//!
//! Artifacts live under `<model_dir>/<kind>/<name>.onnx`. Every load builds
//! a fresh session; nothing is cached across invocations, so replacing an
//! artifact on disk takes effect on the next call.

use std::fmt;
use std::path::{Path, PathBuf};

use ort::{
    session::{
        builder::{GraphOptimizationLevel, SessionBuilder},
        Session,
    },
    value::ValueType,
};

use crate::error::ModelError;
use crate::ops::OperatorRegistry;

pub const MODEL_EXTENSION: &str = "onnx";

/// The two model roles a recognition deployment needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Segmentation,
    Recognition,
}

impl ModelKind {
    /// Subdirectory of the model root holding artifacts of this kind.
    pub fn subdir(self) -> &'static str {
        match self {
            ModelKind::Segmentation => "segmentation",
            ModelKind::Recognition => "recognition",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subdir())
    }
}

/// Resolves model names to on-disk artifacts and builds sessions for them.
pub struct ModelSource {
    model_dir: PathBuf,
    registry: OperatorRegistry,
}

impl ModelSource {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self::with_registry(model_dir, OperatorRegistry::standard())
    }

    pub fn with_registry(model_dir: impl Into<PathBuf>, registry: OperatorRegistry) -> Self {
        Self {
            model_dir: model_dir.into(),
            registry,
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    /// Path an artifact of `kind` named `name` is expected at.
    pub fn artifact_path(&self, kind: ModelKind, name: &str) -> PathBuf {
        self.model_dir
            .join(kind.subdir())
            .join(format!("{name}.{MODEL_EXTENSION}"))
    }

    /// Build a session for the named artifact, running every registered
    /// operator hook over the builder first.
    pub fn load(&self, kind: ModelKind, name: &str) -> Result<Session, ModelError> {
        let path = self.artifact_path(kind, name);
        if !path.is_file() {
            return Err(ModelError::NotFound {
                kind,
                name: name.to_string(),
                path,
            });
        }

        let load_err = |source| ModelError::Load {
            kind,
            name: name.to_string(),
            source,
        };
        let builder = session_builder().map_err(load_err)?;
        let mut builder = self.registry.apply_all(builder).map_err(load_err)?;
        builder.commit_from_file(&path).map_err(load_err)
    }

    /// Names of the artifacts available for `kind`, sorted. A missing
    /// subdirectory counts as no artifacts rather than an error.
    pub fn list(&self, kind: ModelKind) -> Result<Vec<String>, ModelError> {
        let dir = self.model_dir.join(kind.subdir());
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&dir).map_err(|source| ModelError::List {
            kind,
            path: dir.clone(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ModelError::List {
                kind,
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            let is_model = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case(MODEL_EXTENSION))
                .unwrap_or(false);
            if path.is_file() && is_model {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Session builder with our optimization level and any enabled execution
/// providers registered.
pub fn session_builder() -> ort::Result<SessionBuilder> {
    #[allow(unused_mut)]
    let mut builder =
        Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;

    #[cfg(feature = "openvino")]
    {
        use ort::ep::{self, ExecutionProvider};

        let ep = ep::OpenVINO::default();
        if ep.is_available()? {
            ep.register(&mut builder)?;
        } else {
            log::warn!("openvino feature is enabled, onnx runtime not compiled with openvino")
        }
    }

    #[cfg(feature = "cuda")]
    {
        use ort::ep::{self, ExecutionProvider};

        let ep = ep::CUDA::default();
        if ep.is_available()? {
            ep.register(&mut builder)?;
        } else {
            log::warn!("cuda feature is enabled, onnx runtime not compiled with cuda")
        }
    }

    Ok(builder)
}

/// Read the spatial (height, width) a model expects from its declared input
/// signature.
///
/// Our artifacts come from channels-last training stacks, so the first input
/// must be a rank-4 `[batch, height, width, channels]` tensor with static
/// spatial dimensions.
pub fn input_spatial_shape(
    session: &Session,
    kind: ModelKind,
    name: &str,
) -> Result<(u32, u32), ModelError> {
    let signature_err = |reason: String| ModelError::InputSignature {
        kind,
        name: name.to_string(),
        reason,
    };

    let input = session
        .inputs()
        .first()
        .ok_or_else(|| signature_err("model declares no inputs".to_string()))?;

    let dims: Vec<i64> = match input.dtype() {
        ValueType::Tensor { shape, .. } => shape.iter().copied().collect(),
        other => {
            return Err(signature_err(format!(
                "input {:?} is not a tensor: {other:?}",
                input.name()
            )))
        }
    };

    if dims.len() != 4 {
        return Err(signature_err(format!(
            "expected a rank-4 image input, got {dims:?}"
        )));
    }
    let (height, width) = (dims[1], dims[2]);
    if height <= 0 || width <= 0 {
        return Err(signature_err(format!(
            "input height and width must be static, got {dims:?}"
        )));
    }
    Ok((height as u32, width as u32))
}
