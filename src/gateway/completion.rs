use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
};
use async_trait::async_trait;

use crate::error::{Error, Result};

/// Single-shot text completion. No streaming, no multi-turn state.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str, model: &str, max_tokens: u32) -> Result<String>;
}

pub struct OpenAICompletion {
    client: Client<OpenAIConfig>,
}

impl OpenAICompletion {
    pub fn new(api_key: &str) -> Self {
        let openai_config = OpenAIConfig::new().with_api_key(api_key);
        Self::with_config(openai_config)
    }

    pub fn with_config(config: OpenAIConfig) -> Self {
        Self {
            client: Client::with_config(config),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAICompletion {
    async fn complete(&self, prompt: &str, model: &str, max_tokens: u32) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .max_completion_tokens(max_tokens)
            .messages(vec![
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()?
                    .into(),
            ])
            .build()?;

        let response = self.client.chat().create(request).await?;
        log::debug!(
            "Completion from {} finished: {:?}",
            response.model,
            response.choices.first().and_then(|c| c.finish_reason.as_ref())
        );

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Upstream("completion response carried no text".to_string()))
    }
}
