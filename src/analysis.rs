//! Text analysis pipeline.
//!
//! Analysis turns raw text into a normalized sequence of tokens for both
//! indexing and querying:
//!
//! ```text
//! Text → Tokenizer → Token Filters → Analyzed Tokens
//! ```
//!
//! The same [`Analyzer`] instance must be used on the index path and the
//! query path; a mismatch silently produces zero results because the stored
//! terms and the query terms normalize differently. [`crate::index::Index`]
//! enforces this by handing its own analyzer to the query parser it builds.

pub mod analyzer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

pub use analyzer::{Analyzer, KeywordAnalyzer, PipelineAnalyzer, StandardAnalyzer};
pub use token::Token;
pub use token_filter::{LowercaseFilter, StopFilter, TokenFilter};
pub use tokenizer::{KeywordTokenizer, StandardTokenizer, Tokenizer, WhitespaceTokenizer};
