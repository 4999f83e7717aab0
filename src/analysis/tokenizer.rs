//! Text tokenization strategies.

use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::token::Token;

/// Breaks raw text into tokens.
///
/// Tokenizers are deterministic: calling [`Tokenizer::tokenize`] repeatedly
/// on the same text yields the same tokens.
pub trait Tokenizer: std::fmt::Debug + Send + Sync {
    /// Tokenize `text` into a finite sequence of tokens.
    fn tokenize(&self, text: &str) -> Vec<Token>;
}

/// Tokenizer splitting on Unicode word boundaries.
///
/// Punctuation and whitespace are dropped; only word-like runs survive.
/// This is the fine-grained strategy suitable for prose fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTokenizer;

impl StandardTokenizer {
    pub fn new() -> Self {
        StandardTokenizer
    }
}

impl Tokenizer for StandardTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        text.unicode_word_indices()
            .enumerate()
            .map(|(position, (offset, word))| {
                Token::new(word, position, offset, offset + word.len())
            })
            .collect()
    }
}

/// Tokenizer splitting on ASCII/Unicode whitespace only.
///
/// Punctuation stays attached to tokens; useful for identifiers and
/// filenames where `.` and `_` are significant.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl WhitespaceTokenizer {
    pub fn new() -> Self {
        WhitespaceTokenizer
    }
}

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut start = None;
        for (idx, ch) in text.char_indices() {
            if ch.is_whitespace() {
                if let Some(s) = start.take() {
                    tokens.push(Token::new(&text[s..idx], tokens.len(), s, idx));
                }
            } else if start.is_none() {
                start = Some(idx);
            }
        }
        if let Some(s) = start {
            tokens.push(Token::new(&text[s..], tokens.len(), s, text.len()));
        }
        tokens
    }
}

/// Tokenizer emitting the entire input as a single token.
///
/// This is the whole-word strategy: the value matches only as an exact
/// term, which suits keyword and identifier fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordTokenizer;

impl KeywordTokenizer {
    pub fn new() -> Self {
        KeywordTokenizer
    }
}

impl Tokenizer for KeywordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        if text.is_empty() {
            return Vec::new();
        }
        vec![Token::new(text, 0, 0, text.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_tokenizer() {
        let tokenizer = StandardTokenizer::new();
        let tokens = tokenizer.tokenize("Hello, World! 42");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello", "World", "42"]);
        assert_eq!(tokens[1].position, 1);
        assert_eq!(tokens[1].start_offset, 7);
        assert_eq!(tokens[1].end_offset, 12);
    }

    #[test]
    fn test_standard_tokenizer_restartable() {
        let tokenizer = StandardTokenizer::new();
        let first = tokenizer.tokenize("apache web server");
        let second = tokenizer.tokenize("apache web server");
        assert_eq!(first, second);
    }

    #[test]
    fn test_whitespace_tokenizer_keeps_punctuation() {
        let tokenizer = WhitespaceTokenizer::new();
        let tokens = tokenizer.tokenize("readme.txt  apache_guide.txt");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["readme.txt", "apache_guide.txt"]);
    }

    #[test]
    fn test_keyword_tokenizer() {
        let tokenizer = KeywordTokenizer::new();
        let tokens = tokenizer.tokenize("New York");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "New York");

        assert!(tokenizer.tokenize("").is_empty());
    }
}
