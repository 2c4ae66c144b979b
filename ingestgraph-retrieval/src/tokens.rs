//! Token counting (spec §4.3 step 6). Mirrors
//! `count_tokens_in_records`'s use of `tiktoken.get_encoding("cl100k_base")`;
//! `tiktoken-rs` exposes the same encoding directly. Falls back to the same
//! `len/4` heuristic when the encoder can't be constructed, rather than
//! failing the whole assembly over a token-count estimate.

use tiktoken_rs::CoreBPE;

pub struct TokenCounter {
    bpe: Option<CoreBPE>,
}

impl TokenCounter {
    pub fn new() -> Self {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| tracing::warn!(error = %e, "failed to load cl100k_base encoding, falling back to len/4 estimate"))
            .ok();
        TokenCounter { bpe }
    }

    pub fn count(&self, text: &str) -> usize {
        match &self.bpe {
            Some(bpe) => bpe.encode_ordinary(text).len(),
            None => text.len() / 4,
        }
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        TokenCounter::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_tokens_for_plain_text() {
        let counter = TokenCounter::new();
        assert!(counter.count("hello world") > 0);
    }

    #[test]
    fn empty_text_counts_to_zero() {
        let counter = TokenCounter::new();
        assert_eq!(counter.count(""), 0);
    }
}
