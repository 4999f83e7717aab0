//! One token searched across several fields.

use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::query::boolean::BooleanQuery;
use crate::query::term::TermQuery;
use crate::query::{Query, ScoredDoc};

/// Matches the token in any of the given fields (OR semantics).
///
/// Logically a SHOULD-combination of one [`TermQuery`] per field: a
/// document matching in several fields accumulates score from each, and no
/// document is returned twice. The token must already be normalized by the
/// index's analyzer.
#[derive(Debug, Clone)]
pub struct MultiFieldQuery {
    fields: Vec<String>,
    token: String,
}

impl MultiFieldQuery {
    /// Create a multi-field query.
    pub fn new<I, S>(fields: I, token: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MultiFieldQuery {
            fields: fields.into_iter().map(Into::into).collect(),
            token: token.into(),
        }
    }

    fn expand(&self) -> BooleanQuery {
        let mut query = BooleanQuery::new();
        for field in &self.fields {
            query.add_should(Box::new(TermQuery::new(field.clone(), self.token.clone())));
        }
        query
    }
}

impl Query for MultiFieldQuery {
    fn evaluate(&self, reader: &IndexReader) -> Result<Vec<ScoredDoc>> {
        self.expand().evaluate(reader)
    }

    fn description(&self) -> String {
        self.expand().description()
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }
}
