//! Numeric range query.

use std::ops::Bound;

use crate::error::{Result, SedumError};
use crate::index::reader::IndexReader;
use crate::query::{Query, ScoredDoc};
use crate::schema::FieldType;

/// Matches documents whose numeric field value falls within a bound.
///
/// Numeric columns are stored sorted by value inside each segment, so
/// evaluation scans only the matching value range instead of every
/// document. Matches receive a uniform score of 1.0.
#[derive(Debug, Clone)]
pub struct RangeQuery {
    field: String,
    low: Bound<i64>,
    high: Bound<i64>,
}

impl RangeQuery {
    /// Create a range query with explicit bounds.
    pub fn new(field: impl Into<String>, low: Bound<i64>, high: Bound<i64>) -> Self {
        RangeQuery {
            field: field.into(),
            low,
            high,
        }
    }

    /// Convenience constructor mirroring the classic
    /// `(field, low, high, include_low, include_high)` signature; `None`
    /// leaves that side unbounded.
    pub fn long_range(
        field: impl Into<String>,
        low: Option<i64>,
        high: Option<i64>,
        include_low: bool,
        include_high: bool,
    ) -> Self {
        let low = match (low, include_low) {
            (Some(l), true) => Bound::Included(l),
            (Some(l), false) => Bound::Excluded(l),
            (None, _) => Bound::Unbounded,
        };
        let high = match (high, include_high) {
            (Some(h), true) => Bound::Included(h),
            (Some(h), false) => Bound::Excluded(h),
            (None, _) => Bound::Unbounded,
        };
        RangeQuery::new(field, low, high)
    }

    fn bound_value(bound: &Bound<i64>) -> Option<i64> {
        match bound {
            Bound::Included(v) | Bound::Excluded(v) => Some(*v),
            Bound::Unbounded => None,
        }
    }
}

impl Query for RangeQuery {
    fn evaluate(&self, reader: &IndexReader) -> Result<Vec<ScoredDoc>> {
        let options = reader
            .schema()
            .field(&self.field)
            .ok_or_else(|| SedumError::invalid_query(format!("unknown field '{}'", self.field)))?;
        if options.field_type != FieldType::Numeric || !options.indexed {
            return Err(SedumError::invalid_query(format!(
                "field '{}' is not an indexed numeric field",
                self.field
            )));
        }
        if let (Some(low), Some(high)) = (
            Self::bound_value(&self.low),
            Self::bound_value(&self.high),
        ) && low > high
        {
            return Err(SedumError::invalid_query(format!(
                "low bound {low} exceeds high bound {high}"
            )));
        }

        let mut hits = Vec::new();
        for segment in reader.segments() {
            for ordinal in segment.numeric_range(&self.field, self.low, self.high) {
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
        let (open, low) = match self.low {
            Bound::Included(l) => ('[', l.to_string()),
            Bound::Excluded(l) => ('{', l.to_string()),
            Bound::Unbounded => ('[', "*".to_string()),
        };
        let (high, close) = match self.high {
            Bound::Included(h) => (h.to_string(), ']'),
            Bound::Excluded(h) => (h.to_string(), '}'),
            Bound::Unbounded => ("*".to_string(), ']'),
        };
        format!("{}:{open}{low} TO {high}{close}", self.field)
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }
}
