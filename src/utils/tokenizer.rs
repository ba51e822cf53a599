//! Text tokenization.
//!
//! Term identity for the whole engine is defined here: the builder and the
//! query path must tokenize with the same configuration or searches will
//! silently miss. The tokenizer is byte-oriented and ASCII-focused; anything
//! outside ASCII letters (and optionally digits) separates tokens.

use serde::{Deserialize, Serialize};

/// Tokenizer options. The defaults match what the builder and the search
/// endpoint use unless overridden.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// Fold ASCII letters to lowercase.
    pub to_lower: bool,
    /// Treat ASCII digits as token characters.
    pub keep_digits: bool,
    /// Runs shorter than this are discarded.
    pub min_token_len: usize,
    /// Characters past this position in a run are dropped; the run is not split.
    pub max_token_len: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            to_lower: true,
            keep_digits: true,
            min_token_len: 2,
            max_token_len: 64,
        }
    }
}

/// Pure tokenizer: no mutable state after construction, shared freely
/// across builder workers and request handlers.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    cfg: TokenizerConfig,
}

impl Tokenizer {
    pub fn new(cfg: TokenizerConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.cfg
    }

    fn is_token_byte(&self, b: u8) -> bool {
        b.is_ascii_alphabetic() || (self.cfg.keep_digits && b.is_ascii_digit())
    }

    fn normalize(&self, b: u8) -> u8 {
        if self.cfg.to_lower {
            b.to_ascii_lowercase()
        } else {
            b
        }
    }

    /// Scan `text` left to right, accumulating runs of token bytes and
    /// emitting each run at the first non-token boundary or end of input.
    /// Runs below `min_token_len` are dropped; runs at `max_token_len` keep
    /// consuming bytes without growing.
    pub fn tokenize(&self, text: &[u8]) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut cur = String::with_capacity(32);

        for &b in text {
            if self.is_token_byte(b) {
                if cur.len() < self.cfg.max_token_len {
                    cur.push(self.normalize(b) as char);
                }
            } else if cur.len() >= self.cfg.min_token_len {
                tokens.push(std::mem::take(&mut cur));
            } else {
                cur.clear();
            }
        }

        if cur.len() >= self.cfg.min_token_len {
            tokens.push(cur);
        }

        tokens
    }
}
