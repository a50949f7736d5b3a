// Production binding of EmbeddingProvider to the OpenAI client.

use ai_client::{EmbedAgent, OpenAi};
use anyhow::Result;
use async_trait::async_trait;

use crate::traits::EmbeddingProvider;

#[async_trait]
impl EmbeddingProvider for OpenAi {
    fn model(&self) -> &str {
        self.embedding_model()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        EmbedAgent::embed(self, text).await
    }
}
