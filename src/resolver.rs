use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::gateway::{Embedder, ImageGenerator, PollPolicy, generate};
use crate::semantic_cache::{AssetKind, DEFAULT_SIMILARITY_THRESHOLD, GeneratedAsset, SemanticCache};

/// What happened to a freshly generated asset after it was returned.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteBack {
    Stored,
    /// A concurrent request stored the same asset first.
    AlreadyCached,
    /// The cache rejected the write. The URL is still usable, but the next
    /// similar prompt will pay for another generation.
    Lost(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssetOrigin {
    Cached { score: f64 },
    Generated { write_back: WriteBack },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAsset {
    pub url: String,
    pub origin: AssetOrigin,
}

impl ResolvedAsset {
    pub fn is_cache_hit(&self) -> bool {
        matches!(self.origin, AssetOrigin::Cached { .. })
    }
}

/// Turns a text prompt into an image URL: a similar enough cached asset if
/// one exists, otherwise a new generation that is written back to the cache.
pub struct AssetResolver {
    kind: AssetKind,
    embedder: Arc<dyn Embedder>,
    cache: Arc<dyn SemanticCache>,
    generator: Arc<dyn ImageGenerator>,
    policy: PollPolicy,
    threshold: f64,
}

impl AssetResolver {
    pub fn new(
        kind: AssetKind,
        embedder: Arc<dyn Embedder>,
        cache: Arc<dyn SemanticCache>,
        generator: Arc<dyn ImageGenerator>,
    ) -> Self {
        Self {
            kind,
            embedder,
            cache,
            generator,
            policy: PollPolicy::default(),
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub async fn resolve(
        &self,
        prompt: &str,
        use_cache: bool,
        cancel: &CancellationToken,
    ) -> Result<ResolvedAsset> {
        // Needed for the write-back even when the cache is bypassed.
        let embedding = self.embedder.embed(prompt).await?;

        if use_cache {
            if let Some(hit) = self.cache.query(&embedding, self.threshold).await? {
                let score = hit.score.unwrap_or(1.0);
                log::info!("{} cache hit ({:.4}) for '{}'", self.kind, score, prompt);
                return Ok(ResolvedAsset {
                    url: hit.file_url,
                    origin: AssetOrigin::Cached { score },
                });
            }
            log::info!("{} cache miss for '{}'", self.kind, prompt);
        }

        let image = generate(self.generator.as_ref(), prompt, &self.policy, cancel).await?;

        let asset = GeneratedAsset::new(
            self.kind,
            prompt,
            self.generator.model_id(),
            image.file_url.clone(),
            embedding,
        )
        .with_thumb_url(image.thumb_url)
        .with_depth_map_url(image.depth_map_url);

        let write_back = match self.cache.write(&asset).await {
            Ok(true) => WriteBack::Stored,
            Ok(false) => WriteBack::AlreadyCached,
            Err(e) => {
                log::error!(
                    "Generated {} {} could not be cached: {}",
                    self.kind,
                    asset.file_url,
                    e
                );
                WriteBack::Lost(e.to_string())
            }
        };

        Ok(ResolvedAsset {
            url: asset.file_url,
            origin: AssetOrigin::Generated { write_back },
        })
    }
}
