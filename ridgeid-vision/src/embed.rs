//! Embedding extraction from the recognition model.

use ndarray::Array4;
use ort::session::Session;
use ort::value::{Value, ValueType};

use crate::error::{EmbedError, ModelError};
use crate::model::{self, ModelKind, ModelSource};

/// Feature-extraction branch of a recognition model.
///
/// Siamese-style artifacts keep a comparison head next to the embedding
/// branch, so loading picks the declared output that carries the embedding:
/// an output literally named `embedding` wins, otherwise the first output
/// declaring a rank-2 `[batch, dim]` tensor. Artifacts with neither are
/// rejected at load time.
pub struct Extractor {
    session: Session,
    output_name: String,
    input_shape: (u32, u32),
}

impl Extractor {
    pub fn load(source: &ModelSource, name: &str) -> Result<Self, ModelError> {
        let session = source.load(ModelKind::Recognition, name)?;
        let input_shape = model::input_spatial_shape(&session, ModelKind::Recognition, name)?;
        let output_name = embedding_output(&session).ok_or_else(|| ModelError::NoEmbeddingOutput {
            name: name.to_string(),
        })?;
        Ok(Self {
            session,
            output_name,
            input_shape,
        })
    }

    /// (height, width) the model expects.
    pub fn input_shape(&self) -> (u32, u32) {
        self.input_shape
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// Run a preprocessed batch-of-one tensor through the model and return
    /// the raw embedding. Callers own normalization.
    pub fn extract(&mut self, tensor: Array4<f32>) -> Result<Vec<f32>, EmbedError> {
        let input = Value::from_array(tensor).map_err(EmbedError::Inference)?;
        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(EmbedError::Inference)?;

        let value = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| EmbedError::MissingOutput {
                output: self.output_name.clone(),
            })?;
        let (shape, data) = value
            .try_extract_tensor::<f32>()
            .map_err(EmbedError::OutputType)?;

        // Expecting [1, dim]; any other single-vector layout flattens.
        let dim = if shape.len() == 2 {
            shape[1] as usize
        } else {
            data.len()
        };
        if dim == 0 || data.is_empty() {
            return Err(EmbedError::EmptyOutput);
        }
        Ok(data[..dim.min(data.len())].to_vec())
    }
}

fn embedding_output(session: &Session) -> Option<String> {
    if let Some(named) = session.outputs().iter().find(|o| o.name() == "embedding") {
        return Some(named.name().to_string());
    }
    session.outputs().iter().find_map(|output| match output.dtype() {
        ValueType::Tensor { shape, .. } if shape.len() == 2 => Some(output.name().to_string()),
        _ => None,
    })
}
