//! Search execution: scoring, collection, and the searcher facade.

pub mod collector;
pub mod scorer;
pub mod searcher;

pub use collector::{Collector, CountCollector, TopDocsCollector};
pub use scorer::Bm25Scorer;
pub use searcher::{SearchHit, SearchRequest, SearchResults, Searcher};
