//! facecheck-core — face embedding matching and enrollment lifecycle.
//!
//! Compares a freshly captured embedding against a single enrolled template
//! using Euclidean distance between L2-normalized vectors. Persistence goes
//! through the [`SecureStore`] capability; embeddings come from an external
//! [`EmbeddingSource`].

pub mod error;
pub mod metric;
pub mod policy;
pub mod source;
pub mod store;
pub mod types;
pub mod verifier;

pub use error::{CoreError, CoreResult};
pub use metric::{cosine_similarity, euclidean_distance, is_same_person};
pub use policy::{MatchPolicy, SIMILARITY_THRESHOLD};
pub use source::{EmbeddingSource, Exhausted, ReplaySource};
pub use store::{MemoryStore, SecureStore, StorageError, TemplateStore, EMBEDDING_KEY};
pub use types::{Embedding, MatchResult, NormalizedEmbedding, EMBEDDING_SIZE};
pub use verifier::{FaceVerifier, TemplateState};
