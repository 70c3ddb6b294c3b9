use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::metric;

/// Dimensionality of the embeddings produced by the capture pipeline.
pub const EMBEDDING_SIZE: usize = 512;

/// Tolerance on the L2 norm for a vector to count as already normalized.
pub const NORM_TOLERANCE: f32 = 1e-5;

/// Raw face embedding as handed over by the capture side.
///
/// Serializes as a bare JSON array of floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// L2 norm of the raw values.
    pub fn norm(&self) -> f32 {
        metric::l2_norm_f64(&self.values) as f32
    }

    pub fn is_normalized(&self) -> bool {
        (self.norm() - 1.0).abs() <= NORM_TOLERANCE
    }

    /// Rescale to unit length.
    ///
    /// Fails with [`CoreError::DegenerateVector`] for all-zero (or empty)
    /// input and for vectors whose norm is not finite. Always divides, even
    /// when the input is already close to unit length.
    pub fn normalize(&self) -> CoreResult<NormalizedEmbedding> {
        let norm = metric::l2_norm_f64(&self.values);
        if norm == 0.0 || !norm.is_finite() {
            return Err(CoreError::DegenerateVector { norm: norm as f32 });
        }
        Ok(NormalizedEmbedding(
            self.values
                .iter()
                .map(|&v| (f64::from(v) / norm) as f32)
                .collect(),
        ))
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self { values }
    }
}

/// Unit-length embedding. Only obtainable through [`Embedding::normalize`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedEmbedding(Vec<f32>);

impl NormalizedEmbedding {
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Euclidean distance to another normalized embedding.
    pub fn distance(&self, other: &NormalizedEmbedding) -> CoreResult<f32> {
        metric::euclidean_distance(&self.0, &other.0)
    }
}

impl AsRef<[f32]> for NormalizedEmbedding {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// Outcome of one verification call. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub success: bool,
    /// Raw Euclidean distance; lower is more similar.
    pub score: f32,
    pub is_new_user: bool,
}

impl MatchResult {
    /// Score reported when nothing is enrolled.
    pub const MAX_DISTANCE_SENTINEL: f32 = 1.0;

    pub fn new_user() -> Self {
        Self {
            success: false,
            score: Self::MAX_DISTANCE_SENTINEL,
            is_new_user: true,
        }
    }

    /// Display helper for UIs that show "confidence" instead of distance.
    pub fn confidence(&self) -> f32 {
        (1.0 - self.score).clamp(0.0, 1.0)
    }
}
