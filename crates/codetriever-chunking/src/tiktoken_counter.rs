//! Tiktoken-based token counter, used to measure chunk size against
//! `MAX_TOKENS` the same way an OpenAI-compatible encoding would
//! (SPEC_FULL.md §4.4, §8 property 3: token bound).

use crate::error::{ChunkingError, ChunkingResult};
use crate::traits::TokenCounter;
use tiktoken_rs::{CoreBPE, cl100k_base, o200k_base, p50k_base, p50k_edit, r50k_base};

/// Token counter backed by a `tiktoken` encoder selected by model name
/// pattern.
pub struct TiktokenCounter {
    model_name: String,
    encoder: CoreBPE,
    max_tokens: usize,
}

impl TiktokenCounter {
    /// Builds a counter for `model_name`, capped at `max_tokens`.
    ///
    /// # Errors
    /// Returns a [`ChunkingError`] if the underlying encoder can't be built.
    pub fn new(model_name: &str, max_tokens: usize) -> ChunkingResult<Self> {
        let encoder = Self::encoder_for_model(model_name)?;
        Ok(Self {
            model_name: model_name.to_string(),
            encoder,
            max_tokens,
        })
    }

    fn encoder_for_model(model_name: &str) -> ChunkingResult<CoreBPE> {
        let build = |result: tiktoken_rs::Result<CoreBPE>| {
            result.map_err(|e| ChunkingError::TokenCounter {
                model: model_name.to_string(),
                reason: e.to_string(),
            })
        };

        match model_name {
            name if name.starts_with("gpt-4") || name.starts_with("gpt-3.5") => build(cl100k_base()),
            name if name.starts_with("o1") => build(o200k_base()),
            name if name.starts_with("text-davinci") || name.starts_with("text-curie") => {
                build(p50k_base())
            }
            name if name.starts_with("code-") => build(p50k_base()),
            name if name.contains("-edit") => build(p50k_edit()),
            name if name.starts_with("davinci") || name.starts_with("curie") => build(r50k_base()),
            _ => build(cl100k_base()),
        }
    }

    /// `MAX_TOKENS`-bounded counter for the chunker's default model id,
    /// matching the embed stage's `EMBEDDING_MODEL_ID` token budget.
    ///
    /// # Errors
    /// Returns a [`ChunkingError`] if the encoder can't be built.
    pub fn for_budget(max_tokens: usize) -> ChunkingResult<Self> {
        Self::new("cl100k_base", max_tokens)
    }
}

impl TokenCounter for TiktokenCounter {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    fn count(&self, text: &str) -> usize {
        self.encoder.encode_ordinary(text).len()
    }

    fn count_batch(&self, texts: &[&str]) -> Vec<usize> {
        texts.iter().map(|text| self.encoder.encode_ordinary(text).len()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_counter_with_requested_budget() {
        let counter = TiktokenCounter::for_budget(8191).expect("counter");
        assert_eq!(counter.max_tokens(), 8191);
    }

    #[test]
    fn counts_simple_text() {
        let counter = TiktokenCounter::for_budget(8191).expect("counter");
        let count = counter.count("Hello, world!");
        assert!(count > 0 && count <= 5);
    }

    #[test]
    fn batch_counting_matches_individual_counts() {
        let counter = TiktokenCounter::for_budget(8191).expect("counter");
        let texts = vec!["Hello", "World", "Test"];
        let counts = counter.count_batch(&texts);
        assert_eq!(counts.len(), 3);
        assert!(counts.iter().all(|&c| c > 0));
    }

    #[test]
    fn empty_text_counts_zero() {
        let counter = TiktokenCounter::for_budget(8191).expect("counter");
        assert_eq!(counter.count(""), 0);
    }

    #[test]
    fn handles_unicode() {
        let counter = TiktokenCounter::for_budget(8191).expect("counter");
        assert!(counter.count("Hello 👋 World 🌍") > 0);
        assert!(counter.count("你好世界") > 0);
    }

    #[test]
    fn selects_encoder_by_model_pattern() {
        let models = [
            ("gpt-4-0314", 8192),
            ("gpt-3.5-turbo-16k", 16384),
            ("text-davinci-003", 4097),
            ("code-davinci-002", 8001),
            ("o1-preview", 128000),
        ];
        for (model, max_tokens) in models {
            let counter = TiktokenCounter::new(model, max_tokens).expect("counter");
            assert_eq!(counter.name(), model);
            assert_eq!(counter.max_tokens(), max_tokens);
        }
    }
}
