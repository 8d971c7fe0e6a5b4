//! Embedding-based similarity between notes.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::ollama::OllamaClientTrait;

/// Turns text into a vector.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

impl<E: Embedder + ?Sized> Embedder for Arc<E> {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }
}

/// Embedder backed by Ollama's `/api/embed`.
pub struct OllamaEmbedder {
    client: Arc<dyn OllamaClientTrait>,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: Arc<dyn OllamaClientTrait>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client
            .embed(&self.model, text)
            .with_context(|| format!("Failed to embed text with model '{}'", self.model))
    }
}

/// A pair of notes whose bodies are semantically close.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticConnection {
    pub source: String,
    pub target: String,
    pub similarity: f32,
}

/// Computes and caches note embeddings.
///
/// Embeddings are cached by title for the lifetime of the analyzer.
pub struct SemanticAnalyzer<E> {
    embedder: E,
    cache: HashMap<String, Vec<f32>>,
}

impl<E: Embedder> SemanticAnalyzer<E> {
    pub fn new(embedder: E) -> Self {
        Self {
            embedder,
            cache: HashMap::new(),
        }
    }

    fn embedding(&mut self, title: &str, body: &str) -> Result<&[f32]> {
        if !self.cache.contains_key(title) {
            let vector = self.embedder.embed(body)?;
            self.cache.insert(title.to_string(), vector);
        }
        Ok(self.cache.get(title).map(Vec::as_slice).unwrap_or_default())
    }

    /// Returns every note pair whose cosine similarity is at least
    /// `threshold`, in input order.
    ///
    /// `notes` holds `(title, body)` pairs, bodies without heading or
    /// metadata.
    pub fn find_semantic_connections(
        &mut self,
        notes: &[(String, String)],
        threshold: f32,
    ) -> Result<Vec<SemanticConnection>> {
        if notes.len() < 2 {
            return Ok(Vec::new());
        }

        let mut vectors = Vec::with_capacity(notes.len());
        for (title, body) in notes {
            vectors.push(self.embedding(title, body)?.to_vec());
        }

        let mut connections = Vec::new();
        for i in 0..notes.len() {
            for j in i + 1..notes.len() {
                let similarity = cosine_similarity(&vectors[i], &vectors[j]);
                if similarity >= threshold {
                    connections.push(SemanticConnection {
                        source: notes[i].0.clone(),
                        target: notes[j].0.clone(),
                        similarity,
                    });
                }
            }
        }

        tracing::debug!(
            notes = notes.len(),
            connections = connections.len(),
            threshold,
            "found semantic connections"
        );
        Ok(connections)
    }
}

/// Cosine similarity; zero vectors and length mismatches score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Maps a few keywords onto fixed axes and counts calls.
    struct KeywordEmbedder {
        calls: Mutex<usize>,
    }

    impl Embedder for KeywordEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            *self.calls.lock().unwrap() += 1;
            let axis = |word: &str| if text.contains(word) { 1.0 } else { 0.0 };
            Ok(vec![axis("rust"), axis("memory"), axis("pasta")])
        }
    }

    fn notes() -> Vec<(String, String)> {
        vec![
            ("Ownership".into(), "rust memory".into()),
            ("Borrowing".into(), "rust memory safety".into()),
            ("Carbonara".into(), "pasta".into()),
        ]
    }

    #[test]
    fn finds_pairs_above_threshold() {
        let mut analyzer = SemanticAnalyzer::new(KeywordEmbedder {
            calls: Mutex::new(0),
        });

        let connections = analyzer.find_semantic_connections(&notes(), 0.7).unwrap();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].source, "Ownership");
        assert_eq!(connections[0].target, "Borrowing");
        assert!((connections[0].similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn embeddings_are_cached_per_analyzer() {
        let mut analyzer = SemanticAnalyzer::new(KeywordEmbedder {
            calls: Mutex::new(0),
        });

        analyzer.find_semantic_connections(&notes(), 0.7).unwrap();
        analyzer.find_semantic_connections(&notes(), 0.1).unwrap();
        assert_eq!(*analyzer.embedder.calls.lock().unwrap(), 3);
    }

    #[test]
    fn fewer_than_two_notes_yield_nothing() {
        let mut analyzer = SemanticAnalyzer::new(KeywordEmbedder {
            calls: Mutex::new(0),
        });
        let one = vec![("Solo".to_string(), "rust".to_string())];
        assert!(analyzer.find_semantic_connections(&one, 0.0).unwrap().is_empty());
    }

    #[test]
    fn cosine_similarity_handles_degenerate_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
