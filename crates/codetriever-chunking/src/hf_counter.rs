//! `TokenCounter` backed by a loaded `HuggingFace` tokenizer, so the chunk
//! worker measures token counts against the same tokenizer the embed stage
//! will use (SPEC_FULL.md §4.4). Generalizes `codetriever-indexer`'s
//! Jina-specific counter to any `tokenizers::Tokenizer`.

use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::TokenCounter;

/// Counts tokens via a shared `HuggingFace` tokenizer handle.
pub struct HfTokenCounter {
    tokenizer: Arc<Tokenizer>,
    model_name: String,
    max_tokens: usize,
}

impl HfTokenCounter {
    /// Wraps an already-loaded tokenizer, typically obtained from
    /// `EmbeddingProvider::get_tokenizer()` after `ensure_ready()`.
    #[must_use]
    pub fn new(tokenizer: Arc<Tokenizer>, model_name: String, max_tokens: usize) -> Self {
        Self {
            tokenizer,
            model_name,
            max_tokens,
        }
    }
}

impl TokenCounter for HfTokenCounter {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    fn count(&self, text: &str) -> usize {
        self.tokenizer.encode(text, false).map(|e| e.len()).unwrap_or(0)
    }

    fn count_batch(&self, texts: &[&str]) -> Vec<usize> {
        texts.iter().map(|text| self.count(text)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_configured_name_and_budget() {
        let tokenizer = Arc::new(Tokenizer::new(tokenizers::models::bpe::BPE::default()));
        let counter = HfTokenCounter::new(tokenizer, "test-model".to_string(), 512);
        assert_eq!(counter.name(), "test-model");
        assert_eq!(counter.max_tokens(), 512);
    }
}
