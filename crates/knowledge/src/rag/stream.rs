//! Cancellable stream of answer fragments.

use cookbook_core::{AppError, AppResult};
use cookbook_llm::LlmStream;
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;

/// Answer text delivered fragment by fragment.
///
/// Yields non-empty fragments in provider order and ends when the provider
/// signals completion. A connection that closes before that signal yields a
/// `Generation` error instead of a silently truncated answer. After an
/// error, or once the token is cancelled, no further fragments are produced. Dropping the stream releases the
/// underlying provider connection.
pub struct AnswerStream {
    inner: BoxStream<'static, AppResult<String>>,
}

impl AnswerStream {
    pub fn new(source: LlmStream, cancel: CancellationToken) -> Self {
        let inner = stream::unfold(Some(source), move |state| {
            let cancel = cancel.clone();
            async move {
                let mut source = state?;
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            tracing::debug!("Answer stream cancelled");
                            return None;
                        }
                        item = source.next() => item,
                    };

                    match next {
                        None => {
                            tracing::warn!("Provider closed the stream before completion");
                            return Some((
                                Err(AppError::Generation(
                                    "Stream ended before the provider signalled completion"
                                        .to_string(),
                                )),
                                None,
                            ));
                        }
                        Some(Err(e)) => return Some((Err(generation_failure(e)), None)),
                        Some(Ok(chunk)) if chunk.done => {
                            if let Some(usage) = &chunk.usage {
                                tracing::debug!(
                                    prompt_tokens = usage.prompt_tokens,
                                    completion_tokens = usage.completion_tokens,
                                    "Stream finished"
                                );
                            }
                            return (!chunk.content.is_empty()).then(|| (Ok(chunk.content), None));
                        }
                        Some(Ok(chunk)) if chunk.content.is_empty() => continue,
                        Some(Ok(chunk)) => return Some((Ok(chunk.content), Some(source))),
                    }
                }
            }
        })
        .boxed();

        Self { inner }
    }

    /// Drain the stream into the full answer text.
    pub async fn collect_text(mut self) -> AppResult<String> {
        let mut answer = String::new();
        while let Some(fragment) = self.next().await {
            answer.push_str(&fragment?);
        }
        Ok(answer)
    }
}

impl Stream for AnswerStream {
    type Item = AppResult<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

/// Every provider-side failure surfaces as `Generation`.
pub(crate) fn generation_failure(err: AppError) -> AppError {
    match err {
        AppError::Generation(_) => err,
        other => AppError::Generation(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cookbook_llm::LlmStreamChunk;

    fn scripted(items: Vec<AppResult<LlmStreamChunk>>) -> LlmStream {
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn test_skips_empty_fragments_and_stops_on_done() {
        let source = scripted(vec![
            Ok(LlmStreamChunk::fragment("Preheat ")),
            Ok(LlmStreamChunk::fragment("")),
            Ok(LlmStreamChunk::fragment("the oven.")),
            Ok(LlmStreamChunk::finished(None)),
            Ok(LlmStreamChunk::fragment("ignored")),
        ]);

        let fragments: Vec<String> = AnswerStream::new(source, CancellationToken::new())
            .map(|f| f.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["Preheat ", "the oven."]);
    }

    #[tokio::test]
    async fn test_nothing_after_error() {
        let source = scripted(vec![
            Ok(LlmStreamChunk::fragment("Whisk")),
            Err(AppError::Other("connection reset".to_string())),
            Ok(LlmStreamChunk::fragment(" eggs")),
        ]);

        let items: Vec<AppResult<String>> =
            AnswerStream::new(source, CancellationToken::new()).collect().await;
        assert_eq!(items.len(), 2);
        assert!(matches!(items[1], Err(AppError::Generation(_))));
    }

    #[tokio::test]
    async fn test_cancelled_stream_yields_nothing_more() {
        let cancel = CancellationToken::new();
        let source = scripted(vec![
            Ok(LlmStreamChunk::fragment("Simmer")),
            Ok(LlmStreamChunk::fragment(" gently")),
        ]);
        let mut stream = AnswerStream::new(source, cancel.clone());

        assert_eq!(stream.next().await.unwrap().unwrap(), "Simmer");
        cancel.cancel();
        assert!(stream.next().await.is_none());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_truncated_stream_is_generation_error() {
        let source = scripted(vec![Ok(LlmStreamChunk::fragment("Preheat the oven to"))]);

        let items: Vec<AppResult<String>> =
            AnswerStream::new(source, CancellationToken::new()).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "Preheat the oven to");
        assert!(matches!(items[1], Err(AppError::Generation(_))));

        let source = scripted(vec![Ok(LlmStreamChunk::fragment("Preheat the oven to"))]);
        let result = AnswerStream::new(source, CancellationToken::new())
            .collect_text()
            .await;
        assert!(matches!(result, Err(AppError::Generation(_))));
    }

    #[tokio::test]
    async fn test_collect_text() {
        let source = scripted(vec![
            Ok(LlmStreamChunk::fragment("Salt ")),
            Ok(LlmStreamChunk::fragment("to taste.")),
            Ok(LlmStreamChunk::finished(None)),
        ]);
        let answer = AnswerStream::new(source, CancellationToken::new())
            .collect_text()
            .await
            .unwrap();
        assert_eq!(answer, "Salt to taste.");
    }
}
