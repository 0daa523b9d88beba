use crate::{EmbedError, Embedder, normalize};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Model-free embedder using signed feature hashing over word tokens.
///
/// Token vectors are mean pooled and the result is L2 normalised, so texts
/// sharing vocabulary land close together. Output is deterministic across runs
/// of the same binary; `DefaultHasher` may change between Rust releases, so
/// vectors from different toolchains should not be mixed in one index.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub const fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return v;
        }

        let mut tokens = 0usize;
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            #[allow(clippy::cast_possible_truncation)]
            let bucket = (h % self.dimensions as u64) as usize;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
            tokens += 1;
        }

        if tokens > 0 {
            #[allow(clippy::cast_precision_loss)]
            let n = tokens as f32;
            for x in &mut v {
                *x /= n;
            }
        }
        normalize(&mut v);
        v
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &'static str {
        "hashing"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(self.embed_sync(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l2(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
    }

    #[tokio::test]
    async fn embeddings_have_fixed_length_and_unit_norm() {
        let embedder = HashingEmbedder::new(64);
        let v = embedder.embed("Rust ownership and borrowing").await.unwrap();
        assert_eq!(v.len(), 64);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn identical_text_embeds_identically() {
        let embedder = HashingEmbedder::new(32);
        assert_eq!(embedder.embed_sync("Hello, World"), embedder.embed_sync("hello world"));
    }

    #[test]
    fn shared_vocabulary_is_closer() {
        let embedder = HashingEmbedder::new(256);
        let base = embedder.embed_sync("async rust tokio runtime tasks");
        let near = embedder.embed_sync("tokio runtime tasks in async rust services");
        let far = embedder.embed_sync("sourdough bread baking hydration");
        assert!(l2(&base, &near) < l2(&base, &far));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(8);
        assert_eq!(embedder.embed_sync("  --  "), vec![0.0; 8]);
    }
}
