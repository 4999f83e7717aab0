//! Numeric range queries.

use std::sync::Arc;

use sedum::{
    BooleanQuery, Document, Index, MemoryStorage, RangeQuery, Schema, SearchRequest, SedumError,
    StandardAnalyzer, TermQuery,
};

fn open_index_with_sizes(sizes: &[i64]) -> Index {
    let schema = Schema::builder()
        .add_text_field("filename")
        .add_numeric_field("size")
        .build();
    let index = Index::open_or_create(
        Arc::new(MemoryStorage::new()),
        schema,
        Arc::new(StandardAnalyzer::new()),
    )
    .unwrap();

    let writer = index.writer().unwrap();
    for (i, &size) in sizes.iter().enumerate() {
        writer
            .add_document(
                Document::new()
                    .add_text("filename", format!("file {i}"))
                    .add_numeric("size", size),
            )
            .unwrap();
    }
    writer.commit().unwrap();
    writer.close().unwrap();
    index
}

#[test]
fn test_inclusive_bounds_are_boundary_exact() {
    let index = open_index_with_sizes(&[99, 100, 450, 800, 801]);
    let searcher = index.searcher().unwrap();

    let query = RangeQuery::long_range("size", Some(100), Some(800), true, true);
    let results = searcher.search(SearchRequest::new(Box::new(query))).unwrap();
    assert_eq!(results.total_hits, 3);

    let sizes: Vec<i64> = results
        .hits
        .iter()
        .map(|hit| {
            hit.document
                .as_ref()
                .unwrap()
                .get("size")
                .unwrap()
                .as_numeric()
                .unwrap()
        })
        .collect();
    assert!(sizes.contains(&100));
    assert!(sizes.contains(&450));
    assert!(sizes.contains(&800));
    assert!(!sizes.contains(&99));
    assert!(!sizes.contains(&801));
}

#[test]
fn test_exclusive_bounds() {
    let index = open_index_with_sizes(&[100, 450, 800]);
    let searcher = index.searcher().unwrap();

    let query = RangeQuery::long_range("size", Some(100), Some(800), false, false);
    assert_eq!(searcher.count(&query).unwrap(), 1);
}

#[test]
fn test_unbounded_sides() {
    let index = open_index_with_sizes(&[10, 20, 30]);
    let searcher = index.searcher().unwrap();

    let query = RangeQuery::long_range("size", None, Some(20), true, true);
    assert_eq!(searcher.count(&query).unwrap(), 2);

    let query = RangeQuery::long_range("size", Some(20), None, false, true);
    assert_eq!(searcher.count(&query).unwrap(), 1);
}

#[test]
fn test_negative_values() {
    let index = open_index_with_sizes(&[-500, -1, 0, 7]);
    let searcher = index.searcher().unwrap();

    let query = RangeQuery::long_range("size", Some(-500), Some(0), true, true);
    assert_eq!(searcher.count(&query).unwrap(), 3);
}

#[test]
fn test_inverted_bounds_are_invalid() {
    let index = open_index_with_sizes(&[100]);
    let searcher = index.searcher().unwrap();

    let query = RangeQuery::long_range("size", Some(800), Some(100), true, true);
    assert!(matches!(
        searcher.count(&query),
        Err(SedumError::InvalidQuery(_))
    ));
}

#[test]
fn test_range_on_text_field_is_invalid() {
    let index = open_index_with_sizes(&[100]);
    let searcher = index.searcher().unwrap();

    let query = RangeQuery::long_range("filename", Some(1), Some(2), true, true);
    assert!(matches!(
        searcher.count(&query),
        Err(SedumError::InvalidQuery(_))
    ));
}

#[test]
fn test_term_and_range_boolean_combination() {
    // The classic combination: a term MUST plus a numeric range MUST.
    let index = open_index_with_sizes(&[100, 300, 900]);
    let searcher = index.searcher().unwrap();

    let query = BooleanQuery::builder()
        .must(Box::new(TermQuery::new("filename", "file")))
        .must(Box::new(RangeQuery::long_range(
            "size",
            Some(100),
            Some(800),
            true,
            true,
        )))
        .build();
    assert_eq!(searcher.count(&query).unwrap(), 2);
}

#[test]
fn test_numeric_exact_term_matches_decimal_token() {
    let index = open_index_with_sizes(&[100, 450]);
    let searcher = index.searcher().unwrap();
    assert_eq!(searcher.count(&TermQuery::new("size", "450")).unwrap(), 1);
}
