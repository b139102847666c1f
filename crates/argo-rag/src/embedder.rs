//! Offline feature-hashing embedder

use async_trait::async_trait;

use argo_core::{Embedder, Error, Result};

/// Deterministic bag-of-words embedder that needs no model or network.
///
/// Words and adjacent word pairs are hashed with md5 into a fixed number of
/// buckets and the result is L2-normalised. Digests are stable across builds,
/// so vectors persisted by one run stay comparable with queries from the next.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::InvalidInput(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            model_id: format!("hashing-d{}", dimension),
        })
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let normalized = text
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect::<String>();
        let words: Vec<&str> = normalized.split_whitespace().collect();
        let mut embedding = vec![0.0f32; self.dimension];

        for (i, word) in words.iter().enumerate() {
            let hash = stable_hash(word);
            let weight = 1.0 / (1.0 + i as f32 * 0.1);
            embedding[self.bucket(hash)] += weight;

            if word.len() > 3 {
                embedding[self.bucket(hash >> 16)] += weight * 0.5;
            }
        }

        for pair in words.windows(2) {
            let hash = stable_hash(&format!("{} {}", pair[0], pair[1]));
            embedding[self.bucket(hash)] += 0.3;
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for val in &mut embedding {
                *val /= magnitude;
            }
        }
        embedding
    }

    fn bucket(&self, hash: u64) -> usize {
        (hash % self.dimension as u64) as usize
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimension: argo_core::config::DEFAULT_EMBEDDING_DIM,
            model_id: format!("hashing-d{}", argo_core::config::DEFAULT_EMBEDDING_DIM),
        }
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

fn stable_hash(s: &str) -> u64 {
    let digest = md5::compute(s.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest.0[..8]);
    u64::from_le_bytes(bytes)
}
