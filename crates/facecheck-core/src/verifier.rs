//! Register / verify / clear lifecycle around one enrollment template.

use crate::error::{CoreError, CoreResult};
use crate::policy::MatchPolicy;
use crate::store::{SecureStore, TemplateStore};
use crate::types::{Embedding, MatchResult, NormalizedEmbedding};

/// Whether a template is currently on file.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateState {
    NoTemplate,
    TemplateLoaded(NormalizedEmbedding),
}

/// Stateful verifier for a single user identity.
///
/// Vector math runs synchronously; only the store-touching operations
/// (`open`, `reload`, `register`, `clear`) are async.
pub struct FaceVerifier<S> {
    templates: TemplateStore<S>,
    policy: MatchPolicy,
    expected_dim: Option<usize>,
    state: TemplateState,
    last_score: Option<f32>,
    last_match: bool,
}

impl<S: SecureStore> FaceVerifier<S> {
    /// Build a verifier and restore whatever template is already persisted.
    pub async fn open(templates: TemplateStore<S>, policy: MatchPolicy) -> CoreResult<Self> {
        let mut verifier = Self {
            templates,
            policy,
            expected_dim: None,
            state: TemplateState::NoTemplate,
            last_score: None,
            last_match: false,
        };
        verifier.reload().await?;
        Ok(verifier)
    }

    /// Require captures passed to [`register`](Self::register) to have this length.
    pub fn with_expected_dim(mut self, dim: usize) -> Self {
        self.expected_dim = Some(dim);
        self
    }

    /// Re-read the persisted template.
    pub async fn reload(&mut self) -> CoreResult<()> {
        self.state = match self.templates.load().await? {
            Some(template) => TemplateState::TemplateLoaded(template),
            None => TemplateState::NoTemplate,
        };
        tracing::debug!(
            key = self.templates.key(),
            enrolled = self.has_registered_face(),
            "template state restored"
        );
        Ok(())
    }

    /// Compare a fresh capture against the enrolled template.
    ///
    /// With nothing enrolled this never fails and reports a new user,
    /// whatever the capture looks like.
    pub fn verify(&mut self, captured: &Embedding) -> CoreResult<MatchResult> {
        let TemplateState::TemplateLoaded(template) = &self.state else {
            tracing::info!(
                key = self.templates.key(),
                "verify: no template, registration required"
            );
            return Ok(MatchResult::new_user());
        };

        let probe = captured.normalize()?;
        let (distance, matched) = self.policy.evaluate(&probe, template)?;

        self.last_score = Some(distance);
        self.last_match = matched;

        tracing::info!(
            key = self.templates.key(),
            score = distance,
            threshold = self.policy.threshold(),
            matched,
            "verify: compared against template"
        );

        Ok(MatchResult {
            success: matched,
            score: distance,
            is_new_user: false,
        })
    }

    /// Normalize and persist `captured` as the template, replacing any previous one.
    pub async fn register(&mut self, captured: &Embedding) -> CoreResult<()> {
        if let Some(expected) = self.expected_dim {
            if captured.dim() != expected {
                return Err(CoreError::DimensionMismatch {
                    expected,
                    actual: captured.dim(),
                });
            }
        }

        let template = self.templates.save(captured).await?;
        tracing::info!(key = self.templates.key(), dim = template.dim(), "face registered");
        self.state = TemplateState::TemplateLoaded(template);
        Ok(())
    }

    /// Delete the template and forget the last comparison.
    pub async fn clear(&mut self) -> CoreResult<()> {
        self.templates.clear().await?;
        self.state = TemplateState::NoTemplate;
        self.last_score = None;
        self.last_match = false;
        tracing::info!(key = self.templates.key(), "face template cleared");
        Ok(())
    }

    pub fn state(&self) -> &TemplateState {
        &self.state
    }

    pub fn has_registered_face(&self) -> bool {
        matches!(self.state, TemplateState::TemplateLoaded(_))
    }

    pub fn template(&self) -> Option<&NormalizedEmbedding> {
        match &self.state {
            TemplateState::TemplateLoaded(t) => Some(t),
            TemplateState::NoTemplate => None,
        }
    }

    /// Distance from the last comparison against a template.
    pub fn last_score(&self) -> Option<f32> {
        self.last_score
    }

    /// Outcome of the last comparison against a template.
    pub fn is_match(&self) -> bool {
        self.last_match
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    pub fn templates(&self) -> &TemplateStore<S> {
        &self.templates
    }
}
