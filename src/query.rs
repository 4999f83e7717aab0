//! Query types and their evaluation.
//!
//! Queries are state-free nodes evaluated against an
//! [`crate::index::IndexReader`] snapshot. Evaluation returns every live
//! matching document with its score, ordered by ascending document ID and
//! free of duplicates; the searcher layers limiting and ranking on top.

pub mod boolean;
pub mod match_all;
pub mod multi_field;
pub mod parser;
pub mod range;
pub mod term;

pub use boolean::{BooleanClause, BooleanQuery, BooleanQueryBuilder, Occur};
pub use match_all::MatchAllQuery;
pub use multi_field::MultiFieldQuery;
pub use parser::QueryParser;
pub use range::RangeQuery;
pub use term::TermQuery;

use crate::error::Result;
use crate::index::reader::IndexReader;

/// A matching document with its accumulated score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    pub doc_id: u64,
    pub score: f32,
}

/// A query node evaluable against a reader snapshot.
pub trait Query: std::fmt::Debug + Send + Sync {
    /// Evaluate against `reader`, returning live matches in ascending
    /// document-ID order with no duplicates.
    fn evaluate(&self, reader: &IndexReader) -> Result<Vec<ScoredDoc>>;

    /// Human-readable form of the query (`+` marks MUST, `-` MUST_NOT).
    fn description(&self) -> String;

    /// Clone into a boxed trait object.
    fn clone_box(&self) -> Box<dyn Query>;
}

impl Clone for Box<dyn Query> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
