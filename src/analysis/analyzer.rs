//! Analyzers combine a tokenizer with a chain of token filters.

use crate::analysis::token::Token;
use crate::analysis::token_filter::{LowercaseFilter, TokenFilter};
use crate::analysis::tokenizer::{KeywordTokenizer, StandardTokenizer, Tokenizer};

/// Turns raw text into a normalized, finite token sequence.
///
/// Implementations are deterministic and restartable: the same text always
/// produces the same tokens. Index-time and query-time analysis must go
/// through the same analyzer instance for term matching to succeed.
pub trait Analyzer: std::fmt::Debug + Send + Sync {
    /// Analyze `text` into normalized tokens.
    fn analyze(&self, text: &str) -> Vec<Token>;
}

/// An analyzer assembled from a tokenizer and an ordered filter chain.
#[derive(Debug)]
pub struct PipelineAnalyzer {
    tokenizer: Box<dyn Tokenizer>,
    filters: Vec<Box<dyn TokenFilter>>,
}

impl PipelineAnalyzer {
    /// Create a pipeline with no filters.
    pub fn new(tokenizer: Box<dyn Tokenizer>) -> Self {
        PipelineAnalyzer {
            tokenizer,
            filters: Vec::new(),
        }
    }

    /// Append a filter to the chain.
    pub fn with_filter(mut self, filter: Box<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }
}

impl Analyzer for PipelineAnalyzer {
    fn analyze(&self, text: &str) -> Vec<Token> {
        let mut tokens = self.tokenizer.tokenize(text);
        for filter in &self.filters {
            tokens = filter.apply(tokens);
        }
        tokens
    }
}

/// The default analyzer: Unicode word tokenization plus lowercasing.
#[derive(Debug, Default)]
pub struct StandardAnalyzer {
    tokenizer: StandardTokenizer,
    lowercase: LowercaseFilter,
}

impl StandardAnalyzer {
    pub fn new() -> Self {
        StandardAnalyzer::default()
    }
}

impl Analyzer for StandardAnalyzer {
    fn analyze(&self, text: &str) -> Vec<Token> {
        self.lowercase.apply(self.tokenizer.tokenize(text))
    }
}

/// Treats the entire field value as one exact term, unchanged.
#[derive(Debug, Default)]
pub struct KeywordAnalyzer {
    tokenizer: KeywordTokenizer,
}

impl KeywordAnalyzer {
    pub fn new() -> Self {
        KeywordAnalyzer::default()
    }
}

impl Analyzer for KeywordAnalyzer {
    fn analyze(&self, text: &str) -> Vec<Token> {
        self.tokenizer.tokenize(text)
    }
}
