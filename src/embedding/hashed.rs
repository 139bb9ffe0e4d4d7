//! Deterministic feature-hashing embedding provider.
//!
//! Tokenizes text into lowercase word unigrams and bigrams, hashes each
//! feature into one of [`EMBEDDING_DIM`] signed bins, and L2-normalizes the
//! result. Identical input always produces an identical vector, with no model
//! files or network access, which makes the whole retrieval path exercisable
//! in tests and on machines without a local model.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use anyhow::Result;

use super::{l2_normalize, EmbeddingProvider, EMBEDDING_DIM};

pub struct HashedEmbeddingProvider;

impl HashedEmbeddingProvider {
    fn accumulate(v: &mut [f32], feature: &str) {
        let mut hasher = DefaultHasher::new();
        feature.hash(&mut hasher);
        let h = hasher.finish();
        let bin = (h % EMBEDDING_DIM as u64) as usize;
        // One hash bit decides the sign so collisions partially cancel
        // instead of always accumulating.
        let sign = if h & (1 << 63) == 0 { 1.0 } else { -1.0 };
        v[bin] += sign;
    }
}

impl EmbeddingProvider for HashedEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; EMBEDDING_DIM];

        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect();

        for token in &tokens {
            Self::accumulate(&mut v, token);
        }
        for pair in tokens.windows(2) {
            Self::accumulate(&mut v, &format!("{} {}", pair[0], pair[1]));
        }

        l2_normalize(&mut v);
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeddings_are_deterministic() {
        let provider = HashedEmbeddingProvider;
        let a = provider.embed("Rust is a systems programming language").unwrap();
        let b = provider.embed("Rust is a systems programming language").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn embeddings_have_expected_dimensions() {
        let provider = HashedEmbeddingProvider;
        let v = provider.embed("hello world").unwrap();
        assert_eq!(v.len(), EMBEDDING_DIM);
    }

    #[test]
    fn embeddings_are_l2_normalized() {
        let provider = HashedEmbeddingProvider;
        let v = provider.embed("a few tokens of text").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn shared_vocabulary_scores_closer_than_disjoint() {
        let provider = HashedEmbeddingProvider;
        let a = provider.embed("the cat sat on the mat").unwrap();
        let b = provider.embed("a cat sat on a mat").unwrap();
        let c = provider.embed("quantum computing uses qubits").unwrap();

        let dot = |x: &[f32], y: &[f32]| -> f32 {
            x.iter().zip(y.iter()).map(|(p, q)| p * q).sum()
        };
        assert!(dot(&a, &b) > dot(&a, &c));
    }

    #[test]
    fn empty_text_is_a_zero_vector() {
        let provider = HashedEmbeddingProvider;
        let v = provider.embed("").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn case_and_punctuation_are_ignored() {
        let provider = HashedEmbeddingProvider;
        let a = provider.embed("Tabs, over spaces!").unwrap();
        let b = provider.embed("tabs over spaces").unwrap();
        assert_eq!(a, b);
    }
}
