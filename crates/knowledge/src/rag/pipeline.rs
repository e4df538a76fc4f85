//! Request-level orchestration: validate, retrieve, generate.

use super::generator::AnswerGenerator;
use super::retriever::Retriever;
use super::stream::AnswerStream;
use crate::index_manager::IndexManager;
use crate::types::{AskRequest, AskResponse};
use cookbook_core::{AppConfig, AppResult};
use cookbook_llm::create_client;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Answers cookbook questions end to end.
pub struct RagPipeline {
    retriever: Retriever,
    generator: AnswerGenerator,
}

impl RagPipeline {
    pub fn new(retriever: Retriever, generator: AnswerGenerator) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    /// Pipeline over `manager` with the configured completion provider.
    pub fn from_config(config: &AppConfig, manager: Arc<IndexManager>) -> AppResult<Self> {
        config.require_credentials()?;
        let client = create_client(
            &config.provider,
            config.endpoint.as_deref(),
            config.api_key.as_deref(),
        )?;

        Ok(Self::new(
            Retriever::new(manager),
            AnswerGenerator::from_config(config, client)?,
        ))
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn generator(&self) -> &AnswerGenerator {
        &self.generator
    }

    pub async fn ask(&self, request: &AskRequest) -> AppResult<AskResponse> {
        request.validate()?;
        tracing::info!("Answering question (k={})", request.k);

        let result = self.retriever.retrieve(&request.question, request.k).await?;
        let answer = self
            .generator
            .generate(&request.question, &result, &request.history)
            .await?;

        Ok(AskResponse { answer })
    }

    /// Retrieval completes before the stream is opened.
    pub async fn ask_stream(
        &self,
        request: &AskRequest,
        cancel: CancellationToken,
    ) -> AppResult<AnswerStream> {
        request.validate()?;
        tracing::info!("Streaming answer (k={})", request.k);

        let result = self.retriever.retrieve(&request.question, request.k).await?;
        self.generator
            .stream(&request.question, &result, &request.history, cancel)
            .await
    }
}
