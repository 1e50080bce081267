//! Text analysis: total word count and top-K most frequent words
//!
//! [`TextAnalyzer`] is a pure function of its input bytes. It performs no I/O,
//! holds no shared state and can be called concurrently from any task.
//!
//! ```rust
//! use wordflow::analyzer::{TextAnalyzer, WordFrequencyEntry};
//!
//! let analyzer = TextAnalyzer::default();
//! let result = analyzer.analyze(b"apple banana apple cherry banana apple").unwrap();
//!
//! assert_eq!(result.total_words, 6);
//! assert_eq!(
//!     result.top_words,
//!     vec![
//!         WordFrequencyEntry::new("apple", 3),
//!         WordFrequencyEntry::new("banana", 2),
//!         WordFrequencyEntry::new("cherry", 1),
//!     ]
//! );
//! ```

pub mod frequency;
pub mod tokenizer;

pub use frequency::{FrequencyTable, WordFrequencyEntry};

use crate::error::{Result, WordflowError};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::{debug, warn};

/// Number of ranked words reported by default
pub const DEFAULT_TOP_K: usize = 10;

/// How `total_words` is counted
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum TotalWordsMode {
    /// Same word tokens used for frequency ranking
    #[default]
    Tokens,
    /// Raw whitespace-delimited chunks, unnormalized
    Whitespace,
}

/// What to do with bytes that are not valid UTF-8
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Replace invalid sequences with U+FFFD
    #[default]
    Lossy,
    /// Reject the input
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub total_words: TotalWordsMode,
    #[serde(default)]
    pub decode: DecodePolicy,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            total_words: TotalWordsMode::default(),
            decode: DecodePolicy::default(),
        }
    }
}

/// Raw file content with the name it was fetched under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub content: Vec<u8>,
}

impl Document {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Word count and ranked frequencies for one document
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub total_words: u64,
    #[serde(rename = "top_10_words")]
    pub top_words: Vec<WordFrequencyEntry>,
}

/// Stateless text analyzer
#[derive(Debug, Clone, Default)]
pub struct TextAnalyzer {
    config: AnalyzerConfig,
}

impl TextAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Count words and rank the most frequent ones
    pub fn analyze(&self, content: &[u8]) -> Result<AnalysisResult> {
        let text = self.decode(content)?;
        let table = FrequencyTable::from_tokens(tokenizer::word_tokens(&text));

        let total_words = match self.config.total_words {
            TotalWordsMode::Tokens => table.total(),
            TotalWordsMode::Whitespace => tokenizer::whitespace_chunk_count(&text) as u64,
        };

        Ok(AnalysisResult {
            total_words,
            top_words: table.top(self.top_k()),
        })
    }

    pub fn analyze_document(&self, document: &Document) -> Result<AnalysisResult> {
        let result = self.analyze(&document.content)?;
        debug!(
            "Analyzed {} ({} bytes): {} words, {} ranked",
            document.name,
            document.content.len(),
            result.total_words,
            result.top_words.len()
        );
        Ok(result)
    }

    /// Total word count only, using the configured counting mode
    pub fn count_words(&self, content: &[u8]) -> Result<u64> {
        let text = self.decode(content)?;
        Ok(match self.config.total_words {
            TotalWordsMode::Tokens => tokenizer::word_token_count(&text) as u64,
            TotalWordsMode::Whitespace => tokenizer::whitespace_chunk_count(&text) as u64,
        })
    }

    /// Ranked frequencies only
    pub fn word_frequencies(&self, content: &[u8]) -> Result<Vec<WordFrequencyEntry>> {
        let text = self.decode(content)?;
        Ok(FrequencyTable::from_tokens(tokenizer::word_tokens(&text)).top(self.top_k()))
    }

    /// Ranked entries never exceed the `top_10_words` contract
    fn top_k(&self) -> usize {
        self.config.top_k.min(DEFAULT_TOP_K)
    }

    fn decode<'a>(&self, content: &'a [u8]) -> Result<Cow<'a, str>> {
        match self.config.decode {
            DecodePolicy::Lossy => {
                let text = String::from_utf8_lossy(content);
                if let Cow::Owned(_) = text {
                    warn!("Input contained invalid UTF-8; replaced offending bytes");
                }
                Ok(text)
            }
            DecodePolicy::Strict => std::str::from_utf8(content)
                .map(Cow::Borrowed)
                .map_err(|e| {
                    WordflowError::decoding(
                        format!("input is not valid UTF-8: {e}"),
                        Some(e.valid_up_to()),
                    )
                }),
        }
    }
}
