//! Answer generation: render the answer prompt, then call the provider.

use super::context::{format_context, format_history};
use super::stream::{generation_failure, AnswerStream};
use crate::types::{HistoryEntry, ScoredChunk};
use cookbook_core::{AppConfig, AppResult};
use cookbook_llm::{LlmClient, LlmRequest};
use cookbook_prompt::{build_prompt, load_prompt, BuiltPrompt, PromptDefinition, ANSWER_PROMPT_ID};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Turns a question, its retrieved context and the recent conversation into
/// an answer.
pub struct AnswerGenerator {
    client: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl AnswerGenerator {
    pub fn new(client: Arc<dyn LlmClient>, prompt: PromptDefinition, model: impl Into<String>) -> Self {
        Self {
            client,
            prompt,
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Generator using the workspace's answer prompt and configured model.
    pub fn from_config(config: &AppConfig, client: Arc<dyn LlmClient>) -> AppResult<Self> {
        let prompt = load_prompt(&config.workspace, ANSWER_PROMPT_ID)?;
        Ok(Self::new(client, prompt, &config.model)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens))
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Fill the answer prompt with the question, context and history.
    pub fn render(
        &self,
        question: &str,
        result: &[ScoredChunk],
        history: &[HistoryEntry],
    ) -> AppResult<BuiltPrompt> {
        let variables = HashMap::from([
            ("question".to_string(), question.trim().to_string()),
            ("context".to_string(), format_context(result)),
            ("history".to_string(), format_history(history)),
        ]);
        build_prompt(&self.prompt, &variables)
    }

    fn request(&self, prompt: &BuiltPrompt) -> LlmRequest {
        let mut request = LlmRequest::new(prompt.user.clone(), self.model.clone())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);
        if let Some(system) = &prompt.system {
            request = request.with_system(system.clone());
        }
        request
    }

    /// One batch completion call.
    pub async fn invoke(&self, prompt: &BuiltPrompt) -> AppResult<String> {
        tracing::debug!(
            provider = self.client.provider_name(),
            model = %self.model,
            prompt_id = %prompt.metadata.source_prompt_id,
            "Requesting answer"
        );

        let response = self
            .client
            .complete(&self.request(prompt))
            .await
            .map_err(generation_failure)?;

        tracing::debug!(
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "Answer received"
        );
        Ok(response.content)
    }

    /// One streaming completion call.
    pub async fn invoke_stream(
        &self,
        prompt: &BuiltPrompt,
        cancel: CancellationToken,
    ) -> AppResult<AnswerStream> {
        tracing::debug!(
            provider = self.client.provider_name(),
            model = %self.model,
            "Requesting streamed answer"
        );

        let source = self
            .client
            .stream(&self.request(prompt))
            .await
            .map_err(generation_failure)?;
        Ok(AnswerStream::new(source, cancel))
    }

    pub async fn generate(
        &self,
        question: &str,
        result: &[ScoredChunk],
        history: &[HistoryEntry],
    ) -> AppResult<String> {
        let prompt = self.render(question, result, history)?;
        self.invoke(&prompt).await
    }

    pub async fn stream(
        &self,
        question: &str,
        result: &[ScoredChunk],
        history: &[HistoryEntry],
        cancel: CancellationToken,
    ) -> AppResult<AnswerStream> {
        let prompt = self.render(question, result, history)?;
        self.invoke_stream(&prompt, cancel).await
    }
}
