//! Match-all query.

use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::query::{Query, ScoredDoc};

/// Matches every live document with a uniform score of 1.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchAllQuery;

impl MatchAllQuery {
    pub fn new() -> Self {
        MatchAllQuery
    }
}

impl Query for MatchAllQuery {
    fn evaluate(&self, reader: &IndexReader) -> Result<Vec<ScoredDoc>> {
        let mut hits = Vec::with_capacity(reader.doc_count() as usize);
        for segment in reader.segments() {
            for ordinal in 0..segment.doc_count() {
                if segment.is_live(ordinal) {
                    hits.push(ScoredDoc {
                        doc_id: segment.doc_id(ordinal),
                        score: 1.0,
                    });
                }
            }
        }
        hits.sort_unstable_by_key(|h| h.doc_id);
        Ok(hits)
    }

    fn description(&self) -> String {
        "*:*".to_string()
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(*self)
    }
}
