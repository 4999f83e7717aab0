//! Searcher: query execution against one reader snapshot.

use std::sync::Arc;

use crate::document::Document;
use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::query::Query;
use crate::search::collector::{Collector, CountCollector, TopDocsCollector};

/// A search to execute: query plus result-shaping parameters.
pub struct SearchRequest {
    query: Box<dyn Query>,
    limit: usize,
    min_score: Option<f32>,
    load_documents: bool,
}

impl SearchRequest {
    /// Create a request with the default limit of 10 hits.
    pub fn new(query: Box<dyn Query>) -> Self {
        SearchRequest {
            query,
            limit: 10,
            min_score: None,
            load_documents: true,
        }
    }

    /// Maximum number of hits to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Drop candidates scoring below the threshold.
    pub fn min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    /// Whether to load stored fields for each hit.
    pub fn load_documents(mut self, load: bool) -> Self {
        self.load_documents = load;
        self
    }
}

impl std::fmt::Debug for SearchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchRequest")
            .field("query", &self.query.description())
            .field("limit", &self.limit)
            .field("min_score", &self.min_score)
            .finish()
    }
}

/// One ranked result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Internal document ID.
    pub doc_id: u64,
    /// Relevance score.
    pub score: f32,
    /// Stored fields, when the request asked for them.
    pub document: Option<Document>,
}

/// Ranked results plus match statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    /// Number of live documents matching the query, before limiting.
    pub total_hits: u64,
    /// Highest score among all matches.
    pub max_score: f32,
    /// At most `limit` hits, descending score, ties by ascending ID.
    pub hits: Vec<SearchHit>,
}

/// Executes queries against one [`IndexReader`] snapshot.
///
/// Searchers are cheap to create and safe to share; they only read, so
/// any number may run in parallel, and abandoning a search mid-flight
/// cannot corrupt shared state.
#[derive(Debug, Clone)]
pub struct Searcher {
    reader: Arc<IndexReader>,
}

impl Searcher {
    /// Create a searcher over `reader`.
    pub fn new(reader: Arc<IndexReader>) -> Self {
        Searcher { reader }
    }

    /// The underlying snapshot.
    pub fn reader(&self) -> &Arc<IndexReader> {
        &self.reader
    }

    /// Execute a search.
    pub fn search(&self, request: SearchRequest) -> Result<SearchResults> {
        let candidates = request.query.evaluate(&self.reader)?;

        let mut collector = TopDocsCollector::new(request.limit);
        for candidate in candidates {
            if let Some(min) = request.min_score
                && candidate.score < min
            {
                continue;
            }
            collector.collect(candidate.doc_id, candidate.score);
        }

        let total_hits = collector.total_hits();
        let max_score = collector.max_score();
        let mut hits = Vec::new();
        for scored in collector.results() {
            let document = if request.load_documents {
                Some(self.reader.document(scored.doc_id)?)
            } else {
                None
            };
            hits.push(SearchHit {
                doc_id: scored.doc_id,
                score: scored.score,
                document,
            });
        }

        Ok(SearchResults {
            total_hits,
            max_score,
            hits,
        })
    }

    /// Count matches without ranking or loading documents.
    pub fn count(&self, query: &dyn Query) -> Result<u64> {
        let mut collector = CountCollector::new();
        for candidate in query.evaluate(&self.reader)? {
            collector.collect(candidate.doc_id, candidate.score);
        }
        Ok(collector.count())
    }
}
