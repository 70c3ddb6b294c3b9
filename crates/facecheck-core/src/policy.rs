use crate::error::CoreResult;
use crate::types::NormalizedEmbedding;

/// Euclidean distance below which two faces are considered the same person.
pub const SIMILARITY_THRESHOLD: f32 = 0.6;

/// Threshold decision over Euclidean distance between normalized embeddings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
    threshold: f32,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            threshold: SIMILARITY_THRESHOLD,
        }
    }
}

impl MatchPolicy {
    /// Build a policy with a custom threshold.
    ///
    /// Returns `None` unless the threshold is finite and positive.
    pub fn with_threshold(threshold: f32) -> Option<Self> {
        (threshold.is_finite() && threshold > 0.0).then_some(Self { threshold })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Strict: a distance equal to the threshold does not match.
    pub fn is_match(&self, distance: f32) -> bool {
        distance < self.threshold
    }

    /// Distance between probe and template, and whether it passes.
    pub fn evaluate(
        &self,
        probe: &NormalizedEmbedding,
        template: &NormalizedEmbedding,
    ) -> CoreResult<(f32, bool)> {
        let distance = template.distance(probe)?;
        Ok((distance, self.is_match(distance)))
    }
}
