//! One-shot document abstracts stored with each collection.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::fallback::summary_or_sentinel;

/// Number of leading characters of a document sent for summarization.
pub const SUMMARY_INPUT_CHARS: usize = 3000;

const SUMMARY_SYSTEM_PROMPT: &str =
    "You write short, factual abstracts of documents. Reply with the abstract only.";

/// The chat completion collaborator used for summaries.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Complete a conversation made of one system and one user message.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> ProviderResult<String>;
}

/// Produces a 100–200 character abstract of a document.
///
/// Never fails: a missing collaborator, a failed call, or an empty reply
/// all yield [`SUMMARY_SENTINEL`](crate::fallback::SUMMARY_SENTINEL).
#[derive(Clone, Default)]
pub struct SummaryGenerator {
    chat: Option<Arc<dyn ChatCompletion>>,
}

impl std::fmt::Debug for SummaryGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryGenerator").field("enabled", &self.chat.is_some()).finish()
    }
}

impl SummaryGenerator {
    /// Summarize through the given chat collaborator.
    pub fn new(chat: Arc<dyn ChatCompletion>) -> Self {
        Self { chat: Some(chat) }
    }

    /// A generator that always returns the sentinel.
    pub fn disabled() -> Self {
        Self { chat: None }
    }

    /// Generate an abstract for `content`.
    pub async fn summarize(&self, content: &str, title: &str) -> String {
        let result = match &self.chat {
            Some(chat) => {
                debug!(title, content_chars = content.chars().count(), "generating summary");
                chat.complete(SUMMARY_SYSTEM_PROMPT, &summary_prompt(content, title)).await
            }
            None => Err(ProviderError::MissingCredentials),
        };
        let summary = summary_or_sentinel(result);
        info!(title, summary_chars = summary.chars().count(), "document summary ready");
        summary
    }
}

/// Build the user prompt from the title and a bounded prefix of the content.
pub(crate) fn summary_prompt(content: &str, title: &str) -> String {
    let preview: String = content.chars().take(SUMMARY_INPUT_CHARS).collect();
    let ellipsis = if content.chars().nth(SUMMARY_INPUT_CHARS).is_some() { "..." } else { "" };
    format!(
        "Write a concise abstract (about 100-200 characters) of the following document. \
         Cover its main content, topic and purpose.\n\n\
         Title: {title}\n\n\
         Content:\n{preview}{ellipsis}\n\n\
         Abstract:"
    )
}
