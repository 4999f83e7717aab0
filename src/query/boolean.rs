//! Boolean composition of queries.

use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::query::{Query, ScoredDoc};

/// Occurrence requirement for one boolean clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    /// The clause must match; candidates are intersected.
    Must,
    /// The clause may match; it widens the candidate set when no MUST
    /// clause is present and contributes to scores either way.
    Should,
    /// The clause must not match; its matches are subtracted.
    MustNot,
}

/// A sub-query tagged with its occurrence requirement.
#[derive(Debug)]
pub struct BooleanClause {
    pub query: Box<dyn Query>,
    pub occur: Occur,
}

impl Clone for BooleanClause {
    fn clone(&self) -> Self {
        BooleanClause {
            query: self.query.clone_box(),
            occur: self.occur,
        }
    }
}

impl BooleanClause {
    pub fn new(query: Box<dyn Query>, occur: Occur) -> Self {
        BooleanClause { query, occur }
    }

    pub fn must(query: Box<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::Must)
    }

    pub fn should(query: Box<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::Should)
    }

    pub fn must_not(query: Box<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::MustNot)
    }
}

/// Combines sub-queries with MUST / SHOULD / MUST_NOT logic.
///
/// A query holding only MUST_NOT clauses matches nothing: exclusion alone
/// gives no candidates to exclude from. This degenerate case is deliberate,
/// not an error.
#[derive(Debug, Default)]
pub struct BooleanQuery {
    clauses: Vec<BooleanClause>,
}

impl BooleanQuery {
    pub fn new() -> Self {
        BooleanQuery::default()
    }

    /// Start building a boolean query fluently.
    pub fn builder() -> BooleanQueryBuilder {
        BooleanQueryBuilder::default()
    }

    pub fn add_clause(&mut self, clause: BooleanClause) {
        self.clauses.push(clause);
    }

    pub fn add_must(&mut self, query: Box<dyn Query>) {
        self.add_clause(BooleanClause::must(query));
    }

    pub fn add_should(&mut self, query: Box<dyn Query>) {
        self.add_clause(BooleanClause::should(query));
    }

    pub fn add_must_not(&mut self, query: Box<dyn Query>) {
        self.add_clause(BooleanClause::must_not(query));
    }

    pub fn clauses(&self) -> &[BooleanClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    fn by_occur(&self, occur: Occur) -> impl Iterator<Item = &BooleanClause> {
        self.clauses.iter().filter(move |c| c.occur == occur)
    }
}

impl Clone for BooleanQuery {
    fn clone(&self) -> Self {
        BooleanQuery {
            clauses: self.clauses.clone(),
        }
    }
}

impl Query for BooleanQuery {
    fn evaluate(&self, reader: &IndexReader) -> Result<Vec<ScoredDoc>> {
        let musts: Vec<_> = self.by_occur(Occur::Must).collect();
        let shoulds: Vec<_> = self.by_occur(Occur::Should).collect();
        let must_nots: Vec<_> = self.by_occur(Occur::MustNot).collect();

        // Exclusion alone gives no candidates to exclude from.
        if musts.is_empty() && shoulds.is_empty() {
            return Ok(Vec::new());
        }

        let mut candidates = if musts.is_empty() {
            let mut union_acc = Vec::new();
            for clause in &shoulds {
                union_acc = union(union_acc, clause.query.evaluate(reader)?);
            }
            union_acc
        } else {
            let mut intersect_acc: Option<Vec<ScoredDoc>> = None;
            for clause in &musts {
                let hits = clause.query.evaluate(reader)?;
                intersect_acc = Some(match intersect_acc {
                    None => hits,
                    Some(prev) => intersect(prev, hits),
                });
            }
            let mut acc = intersect_acc.unwrap_or_default();
            // SHOULD clauses sweeten the score of surviving candidates but
            // never gate membership once a MUST is present.
            for clause in &shoulds {
                add_scores(&mut acc, &clause.query.evaluate(reader)?);
            }
            acc
        };

        for clause in &must_nots {
            candidates = subtract(candidates, &clause.query.evaluate(reader)?);
        }
        Ok(candidates)
    }

    fn description(&self) -> String {
        if self.clauses.is_empty() {
            return "()".to_string();
        }
        let parts: Vec<String> = self
            .clauses
            .iter()
            .map(|clause| match clause.occur {
                Occur::Must => format!("+{}", clause.query.description()),
                Occur::Should => clause.query.description(),
                Occur::MustNot => format!("-{}", clause.query.description()),
            })
            .collect();
        format!("({})", parts.join(" "))
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }
}

/// Builder for [`BooleanQuery`].
#[derive(Debug, Default)]
pub struct BooleanQueryBuilder {
    query: BooleanQuery,
}

impl BooleanQueryBuilder {
    pub fn must(mut self, query: Box<dyn Query>) -> Self {
        self.query.add_must(query);
        self
    }

    pub fn should(mut self, query: Box<dyn Query>) -> Self {
        self.query.add_should(query);
        self
    }

    pub fn must_not(mut self, query: Box<dyn Query>) -> Self {
        self.query.add_must_not(query);
        self
    }

    pub fn build(self) -> BooleanQuery {
        self.query
    }
}

/// Intersect two ID-sorted candidate lists, summing scores.
fn intersect(a: Vec<ScoredDoc>, b: Vec<ScoredDoc>) -> Vec<ScoredDoc> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].doc_id.cmp(&b[j].doc_id) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(ScoredDoc {
                    doc_id: a[i].doc_id,
                    score: a[i].score + b[j].score,
                });
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Union two ID-sorted candidate lists, summing scores on overlap.
fn union(a: Vec<ScoredDoc>, b: Vec<ScoredDoc>) -> Vec<ScoredDoc> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].doc_id.cmp(&b[j].doc_id) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push(ScoredDoc {
                    doc_id: a[i].doc_id,
                    score: a[i].score + b[j].score,
                });
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Add the scores of `extra` onto matching entries of `acc`.
fn add_scores(acc: &mut [ScoredDoc], extra: &[ScoredDoc]) {
    let mut j = 0;
    for hit in acc.iter_mut() {
        while j < extra.len() && extra[j].doc_id < hit.doc_id {
            j += 1;
        }
        if j < extra.len() && extra[j].doc_id == hit.doc_id {
            hit.score += extra[j].score;
        }
    }
}

/// Remove from `a` every document present in `b`.
fn subtract(a: Vec<ScoredDoc>, b: &[ScoredDoc]) -> Vec<ScoredDoc> {
    let mut out = Vec::with_capacity(a.len());
    let mut j = 0;
    for hit in a {
        while j < b.len() && b[j].doc_id < hit.doc_id {
            j += 1;
        }
        if j < b.len() && b[j].doc_id == hit.doc_id {
            continue;
        }
        out.push(hit);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::term::TermQuery;

    fn docs(entries: &[(u64, f32)]) -> Vec<ScoredDoc> {
        entries
            .iter()
            .map(|&(doc_id, score)| ScoredDoc { doc_id, score })
            .collect()
    }

    #[test]
    fn test_intersect() {
        let a = docs(&[(1, 1.0), (3, 2.0), (7, 1.0)]);
        let b = docs(&[(3, 0.5), (7, 0.5), (9, 4.0)]);
        assert_eq!(intersect(a, b), docs(&[(3, 2.5), (7, 1.5)]));
    }

    #[test]
    fn test_union() {
        let a = docs(&[(1, 1.0), (3, 2.0)]);
        let b = docs(&[(3, 0.5), (9, 4.0)]);
        assert_eq!(union(a, b), docs(&[(1, 1.0), (3, 2.5), (9, 4.0)]));
    }

    #[test]
    fn test_subtract() {
        let a = docs(&[(1, 1.0), (3, 2.0), (9, 4.0)]);
        let b = docs(&[(3, 0.1)]);
        assert_eq!(subtract(a, &b), docs(&[(1, 1.0), (9, 4.0)]));
    }

    #[test]
    fn test_add_scores() {
        let mut acc = docs(&[(1, 1.0), (5, 1.0)]);
        add_scores(&mut acc, &docs(&[(5, 2.0), (6, 9.0)]));
        assert_eq!(acc, docs(&[(1, 1.0), (5, 3.0)]));
    }

    #[test]
    fn test_builder_and_description() {
        let query = BooleanQuery::builder()
            .must(Box::new(TermQuery::new("filename", "apache")))
            .should(Box::new(TermQuery::new("content", "web")))
            .must_not(Box::new(TermQuery::new("filename", "spam")))
            .build();
        assert_eq!(query.clauses().len(), 3);
        assert_eq!(
            query.description(),
            "(+filename:apache content:web -filename:spam)"
        );
    }

    #[test]
    fn test_empty_query_description() {
        assert_eq!(BooleanQuery::new().description(), "()");
    }
}
