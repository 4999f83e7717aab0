//! Text query parser.
//!
//! Grammar: whitespace-separated clauses of the form `field:text`, with an
//! implicit AND between clauses. A clause without a field prefix searches
//! the parser's default field. Clause text runs through the analyzer, so a
//! query normalizes exactly like indexed text did — provided the parser
//! was built with the index's own analyzer (use
//! [`crate::index::Index::query_parser`]).

use std::sync::Arc;

use crate::analysis::Analyzer;
use crate::error::{Result, SedumError};
use crate::query::Query;
use crate::query::boolean::BooleanQuery;
use crate::query::term::TermQuery;

/// Parses `field:token` query strings into query trees.
#[derive(Debug, Clone)]
pub struct QueryParser {
    analyzer: Arc<dyn Analyzer>,
    default_field: Option<String>,
}

impl QueryParser {
    /// Create a parser using `analyzer` for clause text.
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        QueryParser {
            analyzer,
            default_field: None,
        }
    }

    /// Set the field searched by clauses without a field prefix.
    pub fn with_default_field(mut self, field: impl Into<String>) -> Self {
        self.default_field = Some(field.into());
        self
    }

    /// Parse a query string.
    ///
    /// Each clause becomes a term query (or a SHOULD-group when the
    /// analyzer splits its text into several tokens); multiple clauses are
    /// combined with MUST. An empty query, or a prefix-less clause with no
    /// default field configured, is an [`SedumError::InvalidQuery`].
    pub fn parse(&self, input: &str) -> Result<Box<dyn Query>> {
        let mut clauses: Vec<Box<dyn Query>> = Vec::new();
        for raw in input.split_whitespace() {
            let (field, text) = match raw.split_once(':') {
                Some((field, text)) if !field.is_empty() => (field, text),
                _ => match self.default_field.as_deref() {
                    Some(field) => (field, raw),
                    None => {
                        return Err(SedumError::invalid_query(format!(
                            "clause '{raw}' has no field prefix and no default field is set"
                        )));
                    }
                },
            };
            if let Some(query) = self.clause_query(field, text) {
                clauses.push(query);
            }
        }

        if clauses.len() > 1 {
            let mut query = BooleanQuery::new();
            for clause in clauses {
                query.add_must(clause);
            }
            return Ok(Box::new(query));
        }
        clauses
            .pop()
            .ok_or_else(|| SedumError::invalid_query("query is empty"))
    }

    /// Parse free text against one explicit field.
    pub fn parse_field(&self, field: &str, text: &str) -> Result<Box<dyn Query>> {
        self.clause_query(field, text)
            .ok_or_else(|| SedumError::invalid_query("query is empty"))
    }

    fn clause_query(&self, field: &str, text: &str) -> Option<Box<dyn Query>> {
        let mut tokens = self.analyzer.analyze(text);
        match tokens.len() {
            0 => None,
            1 => {
                let token = tokens.remove(0);
                Some(Box::new(TermQuery::new(field, token.text)))
            }
            _ => {
                let mut query = BooleanQuery::new();
                for token in tokens {
                    query.add_should(Box::new(TermQuery::new(field, token.text)));
                }
                Some(Box::new(query))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StandardAnalyzer;

    fn parser() -> QueryParser {
        QueryParser::new(Arc::new(StandardAnalyzer::new())).with_default_field("filename")
    }

    #[test]
    fn test_single_clause() {
        let query = parser().parse("content:Java").unwrap();
        // The analyzer lowercases query text just like indexed text.
        assert_eq!(query.description(), "content:java");
    }

    #[test]
    fn test_default_field() {
        let query = parser().parse("apache").unwrap();
        assert_eq!(query.description(), "filename:apache");
    }

    #[test]
    fn test_implicit_and() {
        let query = parser().parse("content:apache filename:readme").unwrap();
        assert_eq!(
            query.description(),
            "(+content:apache +filename:readme)"
        );
    }

    #[test]
    fn test_multi_token_clause_becomes_should_group() {
        let query = parser().parse_field("content", "web server").unwrap();
        assert_eq!(query.description(), "(content:web content:server)");
    }

    #[test]
    fn test_no_default_field_is_invalid() {
        let parser = QueryParser::new(Arc::new(StandardAnalyzer::new()));
        assert!(matches!(
            parser.parse("apache"),
            Err(SedumError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_empty_query_is_invalid() {
        assert!(matches!(
            parser().parse("   "),
            Err(SedumError::InvalidQuery(_))
        ));
    }
}
