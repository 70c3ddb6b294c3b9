use crate::types::Embedding;

/// Producer of face embeddings (camera + detector + recognizer, or a file).
///
/// The core never produces embeddings itself; hosts plug one of these in.
pub trait EmbeddingSource {
    type Error;

    fn capture(&mut self) -> Result<Embedding, Self::Error>;
}

/// Source that hands out a fixed sequence of embeddings, then fails with [`Exhausted`].
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    queue: std::collections::VecDeque<Embedding>,
}

impl ReplaySource {
    pub fn new(embeddings: impl IntoIterator<Item = Embedding>) -> Self {
        Self {
            queue: embeddings.into_iter().collect(),
        }
    }
}

/// [`ReplaySource`] ran out of embeddings.
#[derive(Debug, thiserror::Error)]
#[error("replay source exhausted")]
pub struct Exhausted;

impl EmbeddingSource for ReplaySource {
    type Error = Exhausted;

    fn capture(&mut self) -> Result<Embedding, Exhausted> {
        self.queue.pop_front().ok_or(Exhausted)
    }
}
