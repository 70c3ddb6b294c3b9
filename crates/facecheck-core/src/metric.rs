//! Distance and similarity functions over raw float slices.
//!
//! All functions are pure and require equal-length inputs.

use crate::error::{CoreError, CoreResult};

/// L2 norm accumulated in f64, so squares of very large or very small
/// f32 components neither overflow nor flush to zero.
pub(crate) fn l2_norm_f64(values: &[f32]) -> f64 {
    values
        .iter()
        .map(|&v| f64::from(v) * f64::from(v))
        .sum::<f64>()
        .sqrt()
}

fn ensure_same_dim(a: &[f32], b: &[f32]) -> CoreResult<()> {
    if a.len() != b.len() {
        return Err(CoreError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(())
}

/// Euclidean distance `sqrt(Σ (a_i − b_i)²)`.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> CoreResult<f32> {
    ensure_same_dim(a, b)?;
    Ok(a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt())
}

/// Cosine similarity in [-1, 1]. Higher = more similar.
///
/// Returns 0.0 when either side has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> CoreResult<f32> {
    ensure_same_dim(a, b)?;

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom > 0.0 {
        Ok((dot / denom).clamp(-1.0, 1.0))
    } else {
        Ok(0.0)
    }
}

/// True when the Euclidean distance between `a` and `b` is strictly below `threshold`.
///
/// Inputs are compared as given; normalize first if they come from different scales.
pub fn is_same_person(a: &[f32], b: &[f32], threshold: f32) -> CoreResult<bool> {
    Ok(euclidean_distance(a, b)? < threshold)
}
