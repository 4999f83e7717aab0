//! Token transformation and filtering.

use std::collections::HashSet;

use crate::analysis::token::Token;

/// Transforms a token stream after tokenization.
pub trait TokenFilter: std::fmt::Debug + Send + Sync {
    /// Apply this filter to `tokens`, returning the transformed stream.
    fn apply(&self, tokens: Vec<Token>) -> Vec<Token>;
}

/// Lowercases every token.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowercaseFilter;

impl LowercaseFilter {
    pub fn new() -> Self {
        LowercaseFilter
    }
}

impl TokenFilter for LowercaseFilter {
    fn apply(&self, mut tokens: Vec<Token>) -> Vec<Token> {
        for token in &mut tokens {
            if token.text.chars().any(|c| c.is_uppercase()) {
                token.text = token.text.to_lowercase();
            }
        }
        tokens
    }
}

/// Removes tokens found in a stop list.
///
/// Positions of surviving tokens are left untouched so that gaps remain
/// visible to downstream consumers.
#[derive(Debug, Clone, Default)]
pub struct StopFilter {
    stop_words: HashSet<String>,
}

impl StopFilter {
    /// Build a stop filter from an iterator of words.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StopFilter {
            stop_words: words.into_iter().map(Into::into).collect(),
        }
    }
}

impl TokenFilter for StopFilter {
    fn apply(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens
            .into_iter()
            .filter(|t| !self.stop_words.contains(&t.text))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_filter() {
        let filter = LowercaseFilter::new();
        let tokens = vec![Token::new("Hello", 0, 0, 5), Token::new("world", 1, 6, 11)];
        let filtered = filter.apply(tokens);
        assert_eq!(filtered[0].text, "hello");
        assert_eq!(filtered[1].text, "world");
    }

    #[test]
    fn test_stop_filter() {
        let filter = StopFilter::new(["the", "a"]);
        let tokens = vec![
            Token::new("the", 0, 0, 3),
            Token::new("apache", 1, 4, 10),
            Token::new("a", 2, 11, 12),
            Token::new("guide", 3, 13, 18),
        ];
        let filtered = filter.apply(tokens);
        let texts: Vec<&str> = filtered.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["apache", "guide"]);
        // Positions keep their original values.
        assert_eq!(filtered[0].position, 1);
        assert_eq!(filtered[1].position, 3);
    }
}
