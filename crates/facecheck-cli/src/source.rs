use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use facecheck_core::{Embedding, EmbeddingSource};
use serde::Deserialize;

/// Accepted input shapes: a bare array, or an object with an `embedding` field.
#[derive(Deserialize)]
#[serde(untagged)]
enum EmbeddingDocument {
    Bare(Vec<f32>),
    Wrapped { embedding: Vec<f32> },
}

/// Reads one embedding as JSON from a file, or stdin when the path is `-`.
pub struct JsonEmbeddingSource {
    path: PathBuf,
}

impl JsonEmbeddingSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_text(&self) -> Result<String> {
        if self.path.as_os_str() == "-" {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading embedding from stdin")?;
            return Ok(text);
        }
        std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading embedding file {}", self.path.display()))
    }
}

pub fn parse_embedding(text: &str) -> Result<Embedding> {
    let doc: EmbeddingDocument =
        serde_json::from_str(text).context("embedding must be a JSON array of numbers")?;
    let values = match doc {
        EmbeddingDocument::Bare(v) => v,
        EmbeddingDocument::Wrapped { embedding } => embedding,
    };
    Ok(Embedding::new(values))
}

impl EmbeddingSource for JsonEmbeddingSource {
    type Error = anyhow::Error;

    fn capture(&mut self) -> Result<Embedding> {
        let embedding = parse_embedding(&self.read_text()?)?;
        tracing::debug!(path = %self.path.display(), dim = embedding.dim(), "embedding read");
        Ok(embedding)
    }
}
