//! Unit-normalized fingerprint embeddings and their similarity.

use serde::{Deserialize, Serialize};

use crate::error::RecognitionError;

/// Embedding vector held at unit L2 norm.
///
/// Raw model outputs only become an `Embedding` through [`Embedding::from_raw`],
/// so every stored or compared vector is already normalized and cosine
/// similarity reduces to a dot product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    /// Normalize a raw model output into a unit vector.
    ///
    /// Vectors whose norm is zero or not finite carry no identity signal and
    /// are rejected instead of silently passed through.
    pub fn from_raw(raw: Vec<f32>) -> Result<Self, RecognitionError> {
        let mut v = raw;
        let norm = l2_norm(&v);
        if !norm.is_finite() || norm <= 0.0 {
            return Err(RecognitionError::DegenerateEmbedding);
        }
        for x in &mut v {
            *x /= norm;
        }
        Ok(Self(v))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity of two unit vectors: their dot product, clamped into
/// [-1, 1] against float drift.
pub fn cosine(a: &Embedding, b: &Embedding) -> f32 {
    let dot: f32 = a
        .as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(x, y)| x * y)
        .sum();
    dot.max(-1.0).min(1.0)
}

/// Arithmetic mean of raw per-sample vectors, for multi-sample enrollment.
/// Empty input or mismatched lengths yield None.
pub fn mean_raw(samples: &[Vec<f32>]) -> Option<Vec<f32>> {
    let dim = samples.first()?.len();
    if dim == 0 || samples.iter().any(|s| s.len() != dim) {
        return None;
    }

    let mut acc = vec![0.0f32; dim];
    for sample in samples {
        for (slot, x) in acc.iter_mut().zip(sample) {
            *slot += x;
        }
    }
    let n = samples.len() as f32;
    for slot in &mut acc {
        *slot /= n;
    }
    Some(acc)
}
