//! Hybrid chunker: token-bounded, structure-aware, sibling-merging
//! (SPEC_FULL.md §4.4, glossary "Hybrid chunker").
//!
//! Produces a finite ordered sequence of chunks where every chunk's
//! tokenizer-measured length is at most `max_tokens`; when `merge_peers` is
//! set, adjacent chunks sharing the same `section_path` are coalesced
//! whenever their combined length still fits the budget.

use crate::chunk::ChunkRecord;
use crate::traits::TokenCounter;
use codetriever_extraction::StructuredDocument;

/// Chunker tuning: token budget and whether to coalesce adjacent siblings.
#[derive(Debug, Clone, Copy)]
pub struct HybridChunkerConfig {
    pub max_tokens: usize,
    pub merge_peers: bool,
}

/// Splits a [`StructuredDocument`]'s blocks into token-bounded chunks.
pub struct HybridChunker<C: TokenCounter> {
    counter: C,
    config: HybridChunkerConfig,
}

impl<C: TokenCounter> HybridChunker<C> {
    /// Builds a chunker measuring against `counter` with the given `config`.
    #[must_use]
    pub fn new(counter: C, config: HybridChunkerConfig) -> Self {
        Self { counter, config }
    }

    /// Splits every block of `document` into chunks at or under the token
    /// budget, then merges adjacent same-section chunks when `merge_peers`.
    #[must_use]
    pub fn chunk(&self, document: &StructuredDocument) -> Vec<ChunkRecord> {
        let mut pieces = Vec::new();
        for block in &document.blocks {
            for text in self.split_to_budget(&block.text) {
                pieces.push(ChunkRecord {
                    text,
                    section_path: block.section_path.clone(),
                });
            }
        }

        if self.config.merge_peers {
            self.merge_adjacent_siblings(pieces)
        } else {
            pieces
        }
    }

    /// Greedily word-wraps `text` so every returned piece is within budget.
    fn split_to_budget(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        if self.counter.count(text) <= self.config.max_tokens {
            return vec![text.to_string()];
        }

        let mut pieces = Vec::new();
        let mut current = String::new();
        for word in text.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };

            if self.counter.count(&candidate) <= self.config.max_tokens {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }

            if self.counter.count(word) <= self.config.max_tokens {
                current = word.to_string();
            } else {
                pieces.extend(self.split_long_word(word));
            }
        }
        if !current.is_empty() {
            pieces.push(current);
        }
        pieces
    }

    /// Falls back to a character-level split for a single word that alone
    /// exceeds `max_tokens` (rare, but the token bound invariant must hold
    /// unconditionally).
    fn split_long_word(&self, word: &str) -> Vec<String> {
        let chars: Vec<char> = word.chars().collect();
        let mut pieces = Vec::new();
        let mut current = String::new();
        for ch in chars {
            let mut candidate = current.clone();
            candidate.push(ch);
            if !current.is_empty() && self.counter.count(&candidate) > self.config.max_tokens {
                pieces.push(std::mem::take(&mut current));
            }
            current.push(ch);
        }
        if !current.is_empty() {
            pieces.push(current);
        }
        pieces
    }

    fn merge_adjacent_siblings(&self, pieces: Vec<ChunkRecord>) -> Vec<ChunkRecord> {
        let mut merged: Vec<ChunkRecord> = Vec::new();
        for piece in pieces {
            if let Some(last) = merged.last_mut()
                && last.section_path == piece.section_path
            {
                let combined = format!("{}\n\n{}", last.text, piece.text);
                if self.counter.count(&combined) <= self.config.max_tokens {
                    last.text = combined;
                    continue;
                }
            }
            merged.push(piece);
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codetriever_extraction::DocumentBlock;
    use std::collections::HashMap;

    struct WordCounter;

    impl TokenCounter for WordCounter {
        fn name(&self) -> &str {
            "word-counter"
        }
        fn max_tokens(&self) -> usize {
            usize::MAX
        }
        fn count(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    fn doc(blocks: Vec<DocumentBlock>) -> StructuredDocument {
        StructuredDocument::new(blocks, HashMap::new())
    }

    #[test]
    fn every_chunk_respects_token_budget() {
        let chunker = HybridChunker::new(
            WordCounter,
            HybridChunkerConfig {
                max_tokens: 3,
                merge_peers: false,
            },
        );
        let document = doc(vec![DocumentBlock {
            text: "one two three four five six seven".to_string(),
            section_path: vec!["Intro".to_string()],
            page: Some(1),
        }]);

        let chunks = chunker.chunk(&document);
        assert!(chunks.iter().all(|c| WordCounter.count(&c.text) <= 3));
        assert!(chunks.len() > 1);
    }

    #[test]
    fn merge_peers_coalesces_same_section_siblings() {
        let chunker = HybridChunker::new(
            WordCounter,
            HybridChunkerConfig {
                max_tokens: 10,
                merge_peers: true,
            },
        );
        let document = doc(vec![
            DocumentBlock {
                text: "alpha beta".to_string(),
                section_path: vec!["Intro".to_string()],
                page: Some(1),
            },
            DocumentBlock {
                text: "gamma delta".to_string(),
                section_path: vec!["Intro".to_string()],
                page: Some(1),
            },
        ]);

        let chunks = chunker.chunk(&document);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("alpha"));
        assert!(chunks[0].text.contains("delta"));
    }

    #[test]
    fn merge_peers_does_not_cross_section_boundaries() {
        let chunker = HybridChunker::new(
            WordCounter,
            HybridChunkerConfig {
                max_tokens: 10,
                merge_peers: true,
            },
        );
        let document = doc(vec![
            DocumentBlock {
                text: "alpha beta".to_string(),
                section_path: vec!["Intro".to_string()],
                page: Some(1),
            },
            DocumentBlock {
                text: "gamma delta".to_string(),
                section_path: vec!["Methods".to_string()],
                page: Some(2),
            },
        ]);

        let chunks = chunker.chunk(&document);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        let chunker = HybridChunker::new(
            WordCounter,
            HybridChunkerConfig {
                max_tokens: 10,
                merge_peers: true,
            },
        );
        let chunks = chunker.chunk(&doc(Vec::new()));
        assert!(chunks.is_empty());
    }
}
