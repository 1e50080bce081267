//! Word frequency table with first-occurrence ordering

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A normalized word and how many times it occurred
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordFrequencyEntry {
    pub word: String,
    pub count: u64,
}

impl WordFrequencyEntry {
    pub fn new(word: impl Into<String>, count: u64) -> Self {
        Self {
            word: word.into(),
            count,
        }
    }
}

/// Counts tokens while remembering the order words were first seen
#[derive(Debug, Default)]
pub struct FrequencyTable {
    entries: Vec<WordFrequencyEntry>,
    index: HashMap<String, usize>,
    total: u64,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tokens<I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut table = Self::new();
        for token in tokens {
            table.record(token);
        }
        table
    }

    /// Count one occurrence of `token`
    pub fn record(&mut self, token: String) {
        self.total += 1;
        match self.index.get(&token) {
            Some(&slot) => self.entries[slot].count += 1,
            None => {
                self.index.insert(token.clone(), self.entries.len());
                self.entries.push(WordFrequencyEntry::new(token, 1));
            }
        }
    }

    /// Sum of all counts, duplicates included
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn distinct(&self) -> usize {
        self.entries.len()
    }

    pub fn count_of(&self, word: &str) -> u64 {
        self.index
            .get(word)
            .map(|&slot| self.entries[slot].count)
            .unwrap_or(0)
    }

    /// Every entry, most frequent first, ties in first-occurrence order
    pub fn ranked(&self) -> Vec<WordFrequencyEntry> {
        let mut ranked = self.entries.clone();
        // sort_by is stable: equal counts keep insertion (first-seen) order
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked
    }

    /// The `k` highest-count entries
    pub fn top(&self, k: usize) -> Vec<WordFrequencyEntry> {
        let mut ranked = self.ranked();
        ranked.truncate(k);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(words: &[&str]) -> FrequencyTable {
        FrequencyTable::from_tokens(words.iter().map(|w| w.to_string()))
    }

    #[test]
    fn test_counts_and_totals() {
        let t = table(&["a", "b", "a", "c", "a", "b"]);
        assert_eq!(t.total(), 6);
        assert_eq!(t.distinct(), 3);
        assert_eq!(t.count_of("a"), 3);
        assert_eq!(t.count_of("b"), 2);
        assert_eq!(t.count_of("missing"), 0);
    }

    #[test]
    fn test_ties_keep_first_occurrence_order() {
        let t = table(&["zeta", "alpha", "mid", "alpha", "zeta", "mid"]);
        let top = t.top(3);
        let words: Vec<&str> = top.iter().map(|e| e.word.as_str()).collect();
        assert_eq!(words, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_top_truncates() {
        let words: Vec<String> = (0..25).map(|i| format!("w{i}")).collect();
        let t = FrequencyTable::from_tokens(words);
        assert_eq!(t.top(10).len(), 10);
        assert_eq!(t.top(10)[0].word, "w0");
        assert_eq!(t.top(10)[9].word, "w9");
        assert_eq!(t.top(100).len(), 25);
    }

    #[test]
    fn test_empty_table() {
        let t = FrequencyTable::new();
        assert_eq!(t.total(), 0);
        assert!(t.top(10).is_empty());
    }
}
