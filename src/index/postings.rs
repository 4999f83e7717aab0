//! Terms, postings and the posting-list codec.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SedumError};
use crate::util::varint;

/// An index key: a field name plus a normalized token.
///
/// Equality and ordering consider both components; segment term
/// dictionaries are laid out in `(field, token)` order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Term {
    /// The field this term belongs to.
    pub field: String,
    /// The normalized token text.
    pub token: String,
}

impl Term {
    /// Create a term.
    pub fn new(field: impl Into<String>, token: impl Into<String>) -> Self {
        Term {
            field: field.into(),
            token: token.into(),
        }
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.field, self.token)
    }
}

/// One term occurrence record: segment-local ordinal plus term frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    /// Segment-local document ordinal.
    pub ordinal: u32,
    /// Number of occurrences of the term in the document's field.
    pub term_freq: u32,
}

/// Postings for one term, ordered by ordinal ascending.
///
/// No duplicate ordinals may appear; [`PostingList::push`] enforces the
/// ascending invariant in debug builds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingList {
    postings: Vec<Posting>,
}

impl PostingList {
    pub fn new() -> Self {
        PostingList::default()
    }

    /// Append a posting; ordinals must arrive in strictly ascending order.
    pub fn push(&mut self, ordinal: u32, term_freq: u32) {
        debug_assert!(
            self.postings.last().is_none_or(|p| p.ordinal < ordinal),
            "postings must be appended in ascending ordinal order"
        );
        self.postings.push(Posting { ordinal, term_freq });
    }

    /// Number of documents containing the term (document frequency).
    pub fn doc_freq(&self) -> u32 {
        self.postings.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Posting> {
        self.postings.iter()
    }

    /// Encode as `[count][delta ordinal, term_freq]*` varints into `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        varint::write_u32(buf, self.postings.len() as u32);
        let mut prev = 0u32;
        for posting in &self.postings {
            varint::write_u32(buf, posting.ordinal - prev);
            varint::write_u32(buf, posting.term_freq);
            prev = posting.ordinal;
        }
    }

    /// Decode a posting list previously produced by [`PostingList::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut pos = 0;
        let count = varint::read_u32(bytes, &mut pos)?;
        let mut postings = Vec::with_capacity(count as usize);
        let mut ordinal = 0u32;
        for i in 0..count {
            let delta = varint::read_u32(bytes, &mut pos)?;
            ordinal = if i == 0 { delta } else { ordinal + delta };
            let term_freq = varint::read_u32(bytes, &mut pos)?;
            postings.push(Posting { ordinal, term_freq });
        }
        if pos != bytes.len() {
            return Err(SedumError::index("trailing bytes after posting list"));
        }
        Ok(PostingList { postings })
    }
}

impl FromIterator<(u32, u32)> for PostingList {
    fn from_iter<T: IntoIterator<Item = (u32, u32)>>(iter: T) -> Self {
        let mut list = PostingList::new();
        for (ordinal, term_freq) in iter {
            list.push(ordinal, term_freq);
        }
        list
    }
}
