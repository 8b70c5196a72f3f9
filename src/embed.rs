use std::collections::BTreeSet;

const HASH_ROWS: [u32; 4] = [0, 0x9e37_79b9, 0x85eb_ca6b, 0xc2b2_ae35];

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> Vec<f32>;
}

#[derive(Clone, Debug)]
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dim];
        for token in tokens(text) {
            for seed in HASH_ROWS {
                let mut hasher = crc32fast::Hasher::new_with_initial(seed);
                hasher.update(token.as_bytes());
                let h = hasher.finalize();
                v[(h as usize) % self.dim] += 1.0;
            }
        }
        l2_normalize(&mut v);
        v
    }
}

pub fn tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

pub fn is_zero(v: &[f32]) -> bool {
    v.iter().all(|x| *x == 0.0)
}

// A zero vector is at distance 1 from everything.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        1.0
    } else {
        1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_is_deterministic_and_normalized() {
        let e = HashEmbedder::new(64);
        let a = e.embed("Flight AA123 from Boston to Miami");
        let b = e.embed("Flight AA123 from Boston to Miami");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_embeds_to_zero() {
        let e = HashEmbedder::new(32);
        let v = e.embed("  --  ");
        assert!(is_zero(&v));
        assert_eq!(cosine_distance(&v, &e.embed("boston")), 1.0);
    }

    #[test]
    fn shared_tokens_are_closer() {
        let e = HashEmbedder::default();
        let q = e.embed("flights to miami");
        let near = e.embed("cheap flights to miami today");
        let far = e.embed("lufthansa frankfurt munich airbus");
        assert!(cosine_distance(&q, &near) < cosine_distance(&q, &far));
    }

    #[test]
    fn distances_stay_in_unit_range() {
        let e = HashEmbedder::new(16);
        let a = e.embed("one two three four five six");
        let b = e.embed("seven eight nine ten eleven");
        let d = cosine_distance(&a, &b);
        assert!((0.0..=1.0 + 1e-6).contains(&d), "{d}");
    }

    #[test]
    fn tokens_are_case_folded_and_deduplicated() {
        let t = tokens("Miami miami, MIAMI | $300");
        assert_eq!(t.len(), 2);
        assert!(t.contains("miami"));
        assert!(t.contains("300"));
    }
}
