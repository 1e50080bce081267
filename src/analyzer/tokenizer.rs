//! Tokenization rules for word counting.
//!
//! Two rules exist side by side:
//!
//! - **Word tokens**: maximal runs of word characters (Unicode letters, digits,
//!   underscore). Punctuation and whitespace are delimiters. Tokens are
//!   lowercased, so `"The"` and `"the"` count as the same word.
//! - **Whitespace chunks**: whatever sits between runs of whitespace, untouched.
//!   `"cat, dog!"` is two chunks (`"cat,"` and `"dog!"`).
//!
//! ```rust
//! use wordflow::analyzer::tokenizer::{word_tokens, whitespace_chunk_count};
//!
//! let tokens: Vec<String> = word_tokens("The cat, THE dog.").collect();
//! assert_eq!(tokens, ["the", "cat", "the", "dog"]);
//! assert_eq!(whitespace_chunk_count("The cat, THE dog."), 4);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

static WORD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+").expect("word pattern is a valid regex"));

/// Iterate over lowercased word tokens in document order
pub fn word_tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    WORD_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
}

/// Number of word tokens, without allocating them
pub fn word_token_count(text: &str) -> usize {
    WORD_PATTERN.find_iter(text).count()
}

/// Number of whitespace-delimited chunks, with no normalization
pub fn whitespace_chunk_count(text: &str) -> usize {
    text.split_whitespace().count()
}
