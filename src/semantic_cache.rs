use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Minimum cosine similarity for a stored asset to be reused.
/// Serving the wrong portrait is worse than paying for a regeneration.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.96;

/// Number of nearest neighbours fetched before the threshold is applied.
pub const CANDIDATE_POOL: usize = 15;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AssetKind {
    Portrait,
    Skybox,
}

/// A generated image together with the embedding of the text it was generated from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAsset {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub kind: AssetKind,
    pub prompt: String,
    pub model: String,
    pub file_url: String,
    pub thumb_url: Option<String>,
    pub depth_map_url: Option<String>,
    pub embedding: Vec<f32>,
    /// Similarity to the query vector. Only set on query results.
    #[serde(skip)]
    pub score: Option<f64>,
}

impl GeneratedAsset {
    pub fn new(
        kind: AssetKind,
        prompt: impl Into<String>,
        model: impl Into<String>,
        file_url: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now().trunc_subsecs(6),
            kind,
            prompt: prompt.into(),
            model: model.into(),
            file_url: file_url.into(),
            thumb_url: None,
            depth_map_url: None,
            embedding,
            score: None,
        }
    }

    pub fn with_thumb_url(mut self, thumb_url: Option<String>) -> Self {
        self.thumb_url = thumb_url;
        self
    }

    pub fn with_depth_map_url(mut self, depth_map_url: Option<String>) -> Self {
        self.depth_map_url = depth_map_url;
        self
    }
}

/// A store of generated assets searchable by embedding similarity.
#[async_trait]
pub trait SemanticCache: Send + Sync {
    /// Up to `k` stored assets closest to `embedding`, best first, each with its score set.
    async fn nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<GeneratedAsset>>;

    /// Persists a new asset. Returns `false` when an asset with the same key
    /// was already written, typically by a concurrent request.
    async fn write(&self, asset: &GeneratedAsset) -> Result<bool>;

    /// Best stored asset scoring at least `threshold`, or `None` on a miss.
    async fn query(&self, embedding: &[f32], threshold: f64) -> Result<Option<GeneratedAsset>> {
        let candidates = self.nearest(embedding, CANDIDATE_POOL).await?;
        Ok(best_match(candidates, threshold))
    }
}

/// Drops every candidate below `threshold` and keeps the highest scoring survivor.
pub fn best_match(candidates: Vec<GeneratedAsset>, threshold: f64) -> Option<GeneratedAsset> {
    candidates
        .into_iter()
        .filter(|asset| asset.score.is_some_and(|score| score >= threshold))
        .max_by(|a, b| {
            a.score
                .unwrap_or(f64::MIN)
                .total_cmp(&b.score.unwrap_or(f64::MIN))
        })
}

/// Cosine similarity in f64. A vector compared with itself scores exactly 1.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b).sqrt()).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(url: &str, score: f64) -> GeneratedAsset {
        let mut asset = GeneratedAsset::new(AssetKind::Skybox, "p", "m", url, vec![1.0]);
        asset.score = Some(score);
        asset
    }

    #[test]
    fn self_similarity_is_exactly_one() {
        let v = [0.3f32, -0.7, 0.1, 0.9];
        assert_eq!(cosine_similarity(&v, &v), 1.0);
    }

    #[test]
    fn best_match_ignores_candidates_below_threshold() {
        let candidates = vec![scored("a", 0.95), scored("b", 0.959_999)];
        assert!(best_match(candidates, DEFAULT_SIMILARITY_THRESHOLD).is_none());
    }

    #[test]
    fn best_match_picks_highest_survivor() {
        let candidates = vec![scored("a", 0.97), scored("b", 0.99), scored("c", 0.5)];
        let best = best_match(candidates, DEFAULT_SIMILARITY_THRESHOLD).map(|a| a.file_url);
        assert_eq!(best.as_deref(), Some("b"));
    }
}
