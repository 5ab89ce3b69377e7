//! ModelClient trait — the abstraction over the model backend.
//!
//! A ModelClient takes a fully rendered prompt and returns the model's
//! text, either complete or as a stream of fragments that concatenate to
//! the same text. The reasoning loop calls `complete()` or
//! `stream_completion()` without knowing which backend is in use.

use crate::error::ModelError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A stream of text fragments from the model.
///
/// Fragments concatenate to exactly the text a non-streaming call would
/// have returned.
pub type FragmentReceiver = mpsc::Receiver<std::result::Result<String, ModelError>>;

/// The model-calling collaborator.
///
/// Implementations wrap a concrete provider (HTTP API, local inference,
/// a scripted mock in tests). Any timeout or retry policy belongs to the
/// implementation — the reasoning loop treats a call failure as fatal for
/// the run and never retries on its own.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// A human-readable name for this backend (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Send a prompt and get the complete response text.
    async fn complete(&self, prompt: &str) -> std::result::Result<String, ModelError>;

    /// Send a prompt and get a stream of response fragments.
    ///
    /// Default implementation calls `complete()` and yields the result as
    /// a single fragment.
    async fn stream_completion(
        &self,
        prompt: &str,
    ) -> std::result::Result<FragmentReceiver, ModelError> {
        let text = self.complete(prompt).await?;
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.send(Ok(text)).await;
        Ok(rx)
    }
}
