//! Exact-term query.

use crate::error::{Result, SedumError};
use crate::index::postings::Term;
use crate::index::reader::IndexReader;
use crate::query::{Query, ScoredDoc};
use crate::search::scorer::Bm25Scorer;

/// Matches documents whose posting list for one term exists and is live.
///
/// The token is matched exactly as given; normalize it with the index's
/// analyzer (or build the query through the parser) before constructing
/// the query.
#[derive(Debug, Clone)]
pub struct TermQuery {
    term: Term,
}

impl TermQuery {
    /// Create a term query for `field:token`.
    pub fn new(field: impl Into<String>, token: impl Into<String>) -> Self {
        TermQuery {
            term: Term::new(field, token),
        }
    }

    /// Create a term query from an existing [`Term`].
    pub fn from_term(term: Term) -> Self {
        TermQuery { term }
    }

    /// The underlying term.
    pub fn term(&self) -> &Term {
        &self.term
    }
}

impl Query for TermQuery {
    fn evaluate(&self, reader: &IndexReader) -> Result<Vec<ScoredDoc>> {
        let options = reader.schema().field(&self.term.field).ok_or_else(|| {
            SedumError::invalid_query(format!("unknown field '{}'", self.term.field))
        })?;
        if !options.indexed {
            return Err(SedumError::invalid_query(format!(
                "field '{}' is not indexed",
                self.term.field
            )));
        }

        let doc_freq = reader.doc_freq(&self.term);
        if doc_freq == 0 {
            return Ok(Vec::new());
        }
        let scorer = Bm25Scorer::new(
            reader.doc_count(),
            doc_freq,
            reader.avg_field_length(&self.term.field),
        );

        let mut hits = Vec::new();
        for segment in reader.segments() {
            if let Some(postings) = segment.postings(&self.term) {
                for posting in postings.iter() {
                    if segment.is_live(posting.ordinal) {
                        let field_len = segment.field_length(&self.term.field, posting.ordinal);
                        hits.push(ScoredDoc {
                            doc_id: segment.doc_id(posting.ordinal),
                            score: scorer.score(posting.term_freq as f32, field_len as f32),
                        });
                    }
                }
            }
        }
        hits.sort_unstable_by_key(|h| h.doc_id);
        Ok(hits)
    }

    fn description(&self) -> String {
        self.term.to_string()
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }
}
