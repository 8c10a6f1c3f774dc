use async_openai::{Client, config::OpenAIConfig, types::CreateEmbeddingRequestArgs};
use async_trait::async_trait;

use crate::error::{Error, Result};

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

pub struct OpenAIEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    pub fn new(api_key: &str, model: impl Into<String>, dimensions: usize) -> Self {
        let openai_config = OpenAIConfig::new().with_api_key(api_key);
        Self::with_config(openai_config, model, dimensions)
    }

    pub fn with_config(config: OpenAIConfig, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            client: Client::with_config(config),
            model: model.into(),
            dimensions,
        }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(text.to_string())
            .build()?;

        let response = self.client.embeddings().create(request).await?;
        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|e| e.embedding)
            .ok_or_else(|| Error::Upstream("embedding response carried no vector".to_string()))?;

        // The vector index is built for one dimensionality; anything else cannot be searched.
        if embedding.len() != self.dimensions {
            return Err(Error::Upstream(format!(
                "expected a {}-dimensional embedding, got {}",
                self.dimensions,
                embedding.len()
            )));
        }

        Ok(embedding)
    }
}
