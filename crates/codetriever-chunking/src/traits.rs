//! Token counting abstraction the hybrid chunker is generic over.

/// Counts tokens the way a specific embedding/completion model would,
/// so the chunker's token bound matches what the embed stage will see.
pub trait TokenCounter: Send + Sync {
    /// Identifying name of the underlying model/encoding.
    fn name(&self) -> &str;

    /// Maximum tokens this model accepts in one input.
    fn max_tokens(&self) -> usize;

    /// Counts tokens in a single text.
    fn count(&self, text: &str) -> usize;

    /// Counts tokens in each of a batch of texts.
    fn count_batch(&self, texts: &[&str]) -> Vec<usize> {
        texts.iter().map(|text| self.count(text)).collect()
    }
}
