//! Result collectors.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::query::ScoredDoc;

/// Receives every scored candidate during search execution.
pub trait Collector {
    /// Record one candidate.
    fn collect(&mut self, doc_id: u64, score: f32);
}

/// Keeps the best `limit` documents by descending score, ties broken by
/// ascending document ID for determinism.
#[derive(Debug)]
pub struct TopDocsCollector {
    limit: usize,
    // Min-heap of the current best entries; the root is the worst of them
    // and gets evicted first.
    heap: BinaryHeap<std::cmp::Reverse<HeapEntry>>,
    total_hits: u64,
    max_score: f32,
}

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    score: f32,
    doc_id: u64,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    // "Greater" means better: higher score, or equal score with lower ID.
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.doc_id.cmp(&self.doc_id))
    }
}

impl TopDocsCollector {
    /// Collect at most `limit` results.
    pub fn new(limit: usize) -> Self {
        TopDocsCollector {
            limit,
            heap: BinaryHeap::with_capacity(limit.saturating_add(1)),
            total_hits: 0,
            max_score: 0.0,
        }
    }

    /// Total number of candidates seen, regardless of the limit.
    pub fn total_hits(&self) -> u64 {
        self.total_hits
    }

    /// Highest score seen.
    pub fn max_score(&self) -> f32 {
        self.max_score
    }

    /// The collected top documents, best first.
    pub fn results(self) -> Vec<ScoredDoc> {
        let mut results: Vec<ScoredDoc> = self
            .heap
            .into_iter()
            .map(|std::cmp::Reverse(entry)| ScoredDoc {
                doc_id: entry.doc_id,
                score: entry.score,
            })
            .collect();
        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });
        results
    }
}

impl Collector for TopDocsCollector {
    fn collect(&mut self, doc_id: u64, score: f32) {
        self.total_hits += 1;
        if score > self.max_score {
            self.max_score = score;
        }
        if self.limit == 0 {
            return;
        }
        let entry = HeapEntry { score, doc_id };
        if self.heap.len() < self.limit {
            self.heap.push(std::cmp::Reverse(entry));
        } else {
            let beats_worst = self.heap.peek().is_some_and(|worst| entry > worst.0);
            if beats_worst {
                self.heap.pop();
                self.heap.push(std::cmp::Reverse(entry));
            }
        }
    }
}

/// Counts candidates without keeping them.
#[derive(Debug, Default)]
pub struct CountCollector {
    count: u64,
}

impl CountCollector {
    pub fn new() -> Self {
        CountCollector::default()
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl Collector for CountCollector {
    fn collect(&mut self, _doc_id: u64, _score: f32) {
        self.count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_docs_ordering() {
        let mut collector = TopDocsCollector::new(3);
        collector.collect(1, 0.5);
        collector.collect(2, 2.0);
        collector.collect(3, 1.0);
        collector.collect(4, 0.1);
        collector.collect(5, 3.0);

        assert_eq!(collector.total_hits(), 5);
        assert_eq!(collector.max_score(), 3.0);
        let ids: Vec<u64> = collector.results().iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, vec![5, 2, 3]);
    }

    #[test]
    fn test_score_ties_break_by_ascending_id() {
        let mut collector = TopDocsCollector::new(2);
        collector.collect(9, 1.0);
        collector.collect(3, 1.0);
        collector.collect(6, 1.0);

        let ids: Vec<u64> = collector.results().iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, vec![3, 6]);
    }

    #[test]
    fn test_zero_limit_still_counts() {
        let mut collector = TopDocsCollector::new(0);
        collector.collect(1, 1.0);
        collector.collect(2, 2.0);
        assert_eq!(collector.total_hits(), 2);
        assert!(collector.results().is_empty());
    }

    #[test]
    fn test_count_collector() {
        let mut collector = CountCollector::new();
        collector.collect(1, 0.0);
        collector.collect(2, 0.0);
        assert_eq!(collector.count(), 2);
    }
}
