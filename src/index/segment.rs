//! Immutable index segments.
//!
//! A segment is the unit produced by one flush: a term dictionary with
//! posting lists, per-field length tables, sorted numeric columns, a
//! document-ID table and the stored fields of its documents. Segments are
//! never modified after being written; deletions live in a separate bitmap
//! (see [`crate::index::deletes`]) and physical removal happens at merge
//! time.
//!
//! ## File layout
//!
//! `seg_<id>.idx` (via `StructWriter`, CRC-trailed):
//! magic, version, doc-ID table (varint deltas), field-length tables,
//! numeric columns (value-sorted, zigzag deltas), term dictionary sorted by
//! `(field, token)` with encoded posting lists.
//!
//! `seg_<id>.docs`: one JSON row of stored fields per document ordinal.

use std::collections::BTreeMap;
use std::ops::Bound;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::{Result, SedumError};
use crate::index::deletes::LiveDocs;
use crate::index::postings::{PostingList, Term};
use crate::storage::Storage;
use crate::storage::structured::{StructReader, StructWriter};
use crate::util::varint;

const IDX_MAGIC: u32 = 0x5345_4458; // "SEDX"
const DOCS_MAGIC: u32 = 0x5345_4453; // "SEDS"
const FORMAT_VERSION: u32 = 1;

/// Metadata for one segment, recorded in the commit descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMeta {
    /// Segment identifier, unique within the store.
    pub id: u64,
    /// Number of documents in the segment.
    pub doc_count: u32,
    /// Smallest global document ID in the segment.
    pub min_doc_id: u64,
    /// Largest global document ID in the segment.
    pub max_doc_id: u64,
    /// Generation of the current deletion bitmap, if any.
    pub del_gen: Option<u64>,
    /// Number of logically deleted documents.
    #[serde(default)]
    pub deleted_docs: u32,
}

impl SegmentMeta {
    pub fn idx_file_name(&self) -> String {
        format!("seg_{:06}.idx", self.id)
    }

    pub fn docs_file_name(&self) -> String {
        format!("seg_{:06}.docs", self.id)
    }

    pub fn del_file_name(&self, generation: u64) -> String {
        format!("seg_{:06}_{generation}.del", self.id)
    }

    pub fn has_deletions(&self) -> bool {
        self.del_gen.is_some()
    }

    /// All files belonging to this segment at its current deletion state.
    pub fn file_names(&self) -> Vec<String> {
        let mut names = vec![self.idx_file_name(), self.docs_file_name()];
        if let Some(generation) = self.del_gen {
            names.push(self.del_file_name(generation));
        }
        names
    }
}

/// A fully analyzed document: what the write buffer holds per document and
/// what a flush serializes.
#[derive(Debug, Clone, Default)]
pub struct AnalyzedDoc {
    /// Stored fields only, as returned by fetch.
    pub stored: Document,
    /// Term → in-document frequency for every indexed field.
    pub terms: BTreeMap<Term, u32>,
    /// Token count per indexed text field (for length normalization).
    pub field_lengths: BTreeMap<String, u32>,
    /// Value per indexed numeric field.
    pub numerics: BTreeMap<String, i64>,
}

impl AnalyzedDoc {
    /// Whether the document contains `term` exactly.
    pub fn matches(&self, term: &Term) -> bool {
        self.terms.contains_key(term)
    }
}

/// Writes one immutable segment from a batch of analyzed documents.
pub struct SegmentWriter;

impl SegmentWriter {
    /// Write segment `id` holding `docs` (global ID, analyzed content),
    /// which must be non-empty and in ascending ID order.
    ///
    /// On any error the partially written files are removed so the previous
    /// commit stays the valid state.
    pub fn write(
        storage: &dyn Storage,
        id: u64,
        docs: &[(u64, AnalyzedDoc)],
    ) -> Result<SegmentMeta> {
        if docs.is_empty() {
            return Err(SedumError::index("cannot write an empty segment"));
        }
        debug_assert!(docs.windows(2).all(|w| w[0].0 < w[1].0));

        let meta = SegmentMeta {
            id,
            doc_count: docs.len() as u32,
            min_doc_id: docs[0].0,
            max_doc_id: docs[docs.len() - 1].0,
            del_gen: None,
            deleted_docs: 0,
        };

        let result = Self::write_files(storage, &meta, docs);
        if result.is_err() {
            let _ = storage.delete_file(&meta.idx_file_name());
            let _ = storage.delete_file(&meta.docs_file_name());
        }
        result?;

        log::debug!(
            "flushed segment {} with {} documents (ids {}..={})",
            meta.id,
            meta.doc_count,
            meta.min_doc_id,
            meta.max_doc_id
        );
        Ok(meta)
    }

    fn write_files(
        storage: &dyn Storage,
        meta: &SegmentMeta,
        docs: &[(u64, AnalyzedDoc)],
    ) -> Result<()> {
        // Invert the per-document term maps into posting lists.
        let mut terms: BTreeMap<&Term, PostingList> = BTreeMap::new();
        for (ordinal, (_, doc)) in docs.iter().enumerate() {
            for (term, &term_freq) in &doc.terms {
                terms
                    .entry(term)
                    .or_default()
                    .push(ordinal as u32, term_freq);
            }
        }

        // Per-field length tables.
        let mut field_lengths: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
        for (ordinal, (_, doc)) in docs.iter().enumerate() {
            for (field, &len) in &doc.field_lengths {
                let lengths = field_lengths
                    .entry(field.as_str())
                    .or_insert_with(|| vec![0; docs.len()]);
                lengths[ordinal] = len;
            }
        }

        // Numeric columns, sorted by (value, ordinal) for range scans.
        let mut numerics: BTreeMap<&str, Vec<(i64, u32)>> = BTreeMap::new();
        for (ordinal, (_, doc)) in docs.iter().enumerate() {
            for (field, &value) in &doc.numerics {
                numerics
                    .entry(field.as_str())
                    .or_default()
                    .push((value, ordinal as u32));
            }
        }
        for column in numerics.values_mut() {
            column.sort_unstable();
        }

        let mut idx = StructWriter::new(storage.create_output(&meta.idx_file_name())?);
        idx.write_u32(IDX_MAGIC)?;
        idx.write_u32(FORMAT_VERSION)?;

        // Doc-ID table.
        idx.write_u32(meta.doc_count)?;
        let mut buf = Vec::new();
        let mut prev = 0u64;
        for &(doc_id, _) in docs {
            varint::write_u64(&mut buf, doc_id - prev);
            prev = doc_id;
        }
        idx.write_bytes(&buf)?;

        // Field lengths.
        idx.write_u32(field_lengths.len() as u32)?;
        for (field, lengths) in &field_lengths {
            idx.write_str(field)?;
            buf.clear();
            for &len in lengths {
                varint::write_u32(&mut buf, len);
            }
            idx.write_bytes(&buf)?;
        }

        // Numeric columns.
        idx.write_u32(numerics.len() as u32)?;
        for (field, column) in &numerics {
            idx.write_str(field)?;
            idx.write_u32(column.len() as u32)?;
            buf.clear();
            let mut prev_value = 0i64;
            for &(value, ordinal) in column {
                varint::write_i64(&mut buf, value.wrapping_sub(prev_value));
                varint::write_u32(&mut buf, ordinal);
                prev_value = value;
            }
            idx.write_bytes(&buf)?;
        }

        // Term dictionary with posting lists.
        idx.write_u64(terms.len() as u64)?;
        for (term, postings) in &terms {
            idx.write_str(&term.field)?;
            idx.write_str(&term.token)?;
            buf.clear();
            postings.encode(&mut buf);
            idx.write_bytes(&buf)?;
        }
        idx.close()?;

        // Stored fields, one row per ordinal (possibly empty documents, so
        // fetch can distinguish "exists with nothing stored" from absent).
        let mut store = StructWriter::new(storage.create_output(&meta.docs_file_name())?);
        store.write_u32(DOCS_MAGIC)?;
        store.write_u32(FORMAT_VERSION)?;
        store.write_u32(meta.doc_count)?;
        for (_, doc) in docs {
            store.write_bytes(&serde_json::to_vec(&doc.stored)?)?;
        }
        store.close()
    }
}

/// Read-only view of one segment, fully decoded at open time.
#[derive(Debug)]
pub struct SegmentReader {
    meta: SegmentMeta,
    doc_ids: Vec<u64>,
    field_lengths: AHashMap<String, Vec<u32>>,
    numerics: AHashMap<String, Vec<(i64, u32)>>,
    terms: BTreeMap<Term, PostingList>,
    stored: Vec<Document>,
    live_docs: Option<LiveDocs>,
}

impl SegmentReader {
    /// Open a segment described by `meta`, including its current deletion
    /// bitmap when one exists.
    pub fn open(storage: &dyn Storage, meta: SegmentMeta) -> Result<Self> {
        let mut idx = StructReader::open(storage, &meta.idx_file_name())?;
        if idx.read_u32()? != IDX_MAGIC {
            return Err(SedumError::corrupt(format!(
                "bad magic in {}",
                meta.idx_file_name()
            )));
        }
        let version = idx.read_u32()?;
        if version != FORMAT_VERSION {
            return Err(SedumError::corrupt(format!(
                "unsupported segment format version {version}"
            )));
        }

        let doc_count = idx.read_u32()?;
        if doc_count != meta.doc_count {
            return Err(SedumError::corrupt(format!(
                "segment {} holds {doc_count} docs, descriptor says {}",
                meta.id, meta.doc_count
            )));
        }

        let table = idx.read_bytes()?;
        let mut doc_ids = Vec::with_capacity(doc_count as usize);
        let mut pos = 0;
        let mut prev = 0u64;
        for _ in 0..doc_count {
            prev += varint::read_u64(&table, &mut pos)?;
            doc_ids.push(prev);
        }

        let mut field_lengths = AHashMap::new();
        for _ in 0..idx.read_u32()? {
            let field = idx.read_str()?;
            let blob = idx.read_bytes()?;
            let mut lengths = Vec::with_capacity(doc_count as usize);
            let mut pos = 0;
            for _ in 0..doc_count {
                lengths.push(varint::read_u32(&blob, &mut pos)?);
            }
            field_lengths.insert(field, lengths);
        }

        let mut numerics = AHashMap::new();
        for _ in 0..idx.read_u32()? {
            let field = idx.read_str()?;
            let entries = idx.read_u32()?;
            let blob = idx.read_bytes()?;
            let mut column = Vec::with_capacity(entries as usize);
            let mut pos = 0;
            let mut prev_value = 0i64;
            for _ in 0..entries {
                prev_value = prev_value.wrapping_add(varint::read_i64(&blob, &mut pos)?);
                let ordinal = varint::read_u32(&blob, &mut pos)?;
                column.push((prev_value, ordinal));
            }
            numerics.insert(field, column);
        }

        let term_count = idx.read_u64()?;
        let mut terms = BTreeMap::new();
        for _ in 0..term_count {
            let field = idx.read_str()?;
            let token = idx.read_str()?;
            let postings = PostingList::decode(&idx.read_bytes()?)?;
            terms.insert(Term::new(field, token), postings);
        }

        let mut store = StructReader::open(storage, &meta.docs_file_name())?;
        if store.read_u32()? != DOCS_MAGIC {
            return Err(SedumError::corrupt(format!(
                "bad magic in {}",
                meta.docs_file_name()
            )));
        }
        store.read_u32()?; // version, covered by the magic/version pair above
        let stored_count = store.read_u32()?;
        if stored_count != doc_count {
            return Err(SedumError::corrupt(format!(
                "stored-field file of segment {} out of sync with index",
                meta.id
            )));
        }
        let mut stored = Vec::with_capacity(doc_count as usize);
        for _ in 0..doc_count {
            stored.push(serde_json::from_slice(&store.read_bytes()?)?);
        }

        let live_docs = match meta.del_gen {
            Some(generation) => Some(LiveDocs::read(
                storage,
                &meta.del_file_name(generation),
                doc_count,
            )?),
            None => None,
        };

        Ok(SegmentReader {
            meta,
            doc_ids,
            field_lengths,
            numerics,
            terms,
            stored,
            live_docs,
        })
    }

    pub fn meta(&self) -> &SegmentMeta {
        &self.meta
    }

    pub fn doc_count(&self) -> u32 {
        self.meta.doc_count
    }

    pub fn deleted_count(&self) -> u32 {
        self.live_docs.as_ref().map_or(0, |l| l.deleted_count())
    }

    pub fn live_doc_count(&self) -> u32 {
        self.doc_count() - self.deleted_count()
    }

    /// Global document ID for a segment-local ordinal.
    pub fn doc_id(&self, ordinal: u32) -> u64 {
        self.doc_ids[ordinal as usize]
    }

    /// Segment-local ordinal for a global document ID, if present.
    pub fn ordinal_of(&self, doc_id: u64) -> Option<u32> {
        self.doc_ids
            .binary_search(&doc_id)
            .ok()
            .map(|idx| idx as u32)
    }

    /// Whether the document at `ordinal` is live.
    pub fn is_live(&self, ordinal: u32) -> bool {
        self.live_docs
            .as_ref()
            .is_none_or(|l| !l.is_deleted(ordinal))
    }

    /// Posting list for `term`, if the segment contains it.
    pub fn postings(&self, term: &Term) -> Option<&PostingList> {
        self.terms.get(term)
    }

    /// Iterate over the whole term dictionary in `(field, token)` order.
    pub fn terms(&self) -> impl Iterator<Item = (&Term, &PostingList)> {
        self.terms.iter()
    }

    /// Stored fields of the document at `ordinal`.
    pub fn document(&self, ordinal: u32) -> Option<&Document> {
        self.stored.get(ordinal as usize)
    }

    /// Token count of `field` in the document at `ordinal`.
    pub fn field_length(&self, field: &str, ordinal: u32) -> u32 {
        self.field_lengths
            .get(field)
            .and_then(|lengths| lengths.get(ordinal as usize).copied())
            .unwrap_or(0)
    }

    /// Total token count of `field` across the segment.
    pub fn total_tokens(&self, field: &str) -> u64 {
        self.field_lengths
            .get(field)
            .map_or(0, |lengths| lengths.iter().map(|&l| l as u64).sum())
    }

    /// Number of documents carrying `field`.
    pub fn docs_with_field(&self, field: &str) -> u32 {
        self.field_lengths
            .get(field)
            .map_or(0, |lengths| lengths.iter().filter(|&&l| l > 0).count() as u32)
    }

    /// Ordinals whose numeric `field` value falls within the bounds,
    /// ascending. Uses the sorted column, so only the matching value range
    /// is scanned.
    pub fn numeric_range(&self, field: &str, low: Bound<i64>, high: Bound<i64>) -> Vec<u32> {
        let Some(column) = self.numerics.get(field) else {
            return Vec::new();
        };
        let start = match low {
            Bound::Included(l) => column.partition_point(|&(v, _)| v < l),
            Bound::Excluded(l) => column.partition_point(|&(v, _)| v <= l),
            Bound::Unbounded => 0,
        };
        let end = match high {
            Bound::Included(h) => column.partition_point(|&(v, _)| v <= h),
            Bound::Excluded(h) => column.partition_point(|&(v, _)| v < h),
            Bound::Unbounded => column.len(),
        };
        let mut ordinals: Vec<u32> = column[start..end].iter().map(|&(_, o)| o).collect();
        ordinals.sort_unstable();
        ordinals
    }

    /// Reconstruct the live documents as analyzed docs, for merging.
    pub(crate) fn to_analyzed_docs(&self) -> Vec<(u64, AnalyzedDoc)> {
        let mut docs: Vec<Option<(u64, AnalyzedDoc)>> = (0..self.doc_count())
            .map(|ordinal| {
                if !self.is_live(ordinal) {
                    return None;
                }
                let mut doc = AnalyzedDoc {
                    stored: self.stored[ordinal as usize].clone(),
                    ..AnalyzedDoc::default()
                };
                for (field, lengths) in &self.field_lengths {
                    let len = lengths[ordinal as usize];
                    if len > 0 {
                        doc.field_lengths.insert(field.clone(), len);
                    }
                }
                Some((self.doc_id(ordinal), doc))
            })
            .collect();

        for (term, postings) in &self.terms {
            for posting in postings.iter() {
                if let Some((_, doc)) = &mut docs[posting.ordinal as usize] {
                    doc.terms.insert(term.clone(), posting.term_freq);
                }
            }
        }
        for (field, column) in &self.numerics {
            for &(value, ordinal) in column {
                if let Some((_, doc)) = &mut docs[ordinal as usize] {
                    doc.numerics.insert(field.clone(), value);
                }
            }
        }

        docs.into_iter().flatten().collect()
    }
}

/// Attach a loaded deletion bitmap override (used by the writer when it
/// applies pending deletes against an already-open segment view).
impl SegmentReader {
    pub(crate) fn live_docs(&self) -> Option<&LiveDocs> {
        self.live_docs.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn analyzed(terms: &[(&str, &str, u32)], numerics: &[(&str, i64)]) -> AnalyzedDoc {
        let mut doc = AnalyzedDoc::default();
        let mut lengths: BTreeMap<String, u32> = BTreeMap::new();
        for &(field, token, tf) in terms {
            doc.terms.insert(Term::new(field, token), tf);
            *lengths.entry(field.to_string()).or_default() += tf;
        }
        doc.field_lengths = lengths;
        for &(field, value) in numerics {
            doc.numerics.insert(field.to_string(), value);
        }
        doc
    }

    fn sample_segment(storage: &MemoryStorage) -> SegmentMeta {
        let docs = vec![
            (
                1,
                AnalyzedDoc {
                    stored: Document::new().add_text("title", "apache guide"),
                    ..analyzed(
                        &[("title", "apache", 1), ("title", "guide", 1)],
                        &[("size", 100)],
                    )
                },
            ),
            (
                2,
                analyzed(&[("title", "readme", 1)], &[("size", 800)]),
            ),
            (
                5,
                analyzed(
                    &[("title", "apache", 2), ("title", "notes", 1)],
                    &[("size", 450)],
                ),
            ),
        ];
        SegmentWriter::write(storage, 1, &docs).unwrap()
    }

    #[test]
    fn test_segment_round_trip() {
        let storage = MemoryStorage::new();
        let meta = sample_segment(&storage);
        assert_eq!(meta.doc_count, 3);
        assert_eq!(meta.min_doc_id, 1);
        assert_eq!(meta.max_doc_id, 5);

        let reader = SegmentReader::open(&storage, meta).unwrap();
        let postings = reader.postings(&Term::new("title", "apache")).unwrap();
        assert_eq!(postings.doc_freq(), 2);
        let hits: Vec<(u32, u32)> = postings.iter().map(|p| (p.ordinal, p.term_freq)).collect();
        assert_eq!(hits, vec![(0, 1), (2, 2)]);

        assert_eq!(reader.doc_id(2), 5);
        assert_eq!(reader.ordinal_of(5), Some(2));
        assert_eq!(reader.ordinal_of(3), None);
        assert_eq!(reader.field_length("title", 2), 3);
        assert_eq!(reader.total_tokens("title"), 6);
        assert_eq!(reader.docs_with_field("title"), 3);

        // Stored fields survive; unstored docs come back empty but present.
        assert_eq!(
            reader.document(0).unwrap().get("title").unwrap().as_text(),
            Some("apache guide")
        );
        assert!(reader.document(1).unwrap().is_empty());
    }

    #[test]
    fn test_numeric_range_scan() {
        let storage = MemoryStorage::new();
        let meta = sample_segment(&storage);
        let reader = SegmentReader::open(&storage, meta).unwrap();

        let ords = reader.numeric_range("size", Bound::Included(100), Bound::Included(800));
        assert_eq!(ords, vec![0, 1, 2]);

        let ords = reader.numeric_range("size", Bound::Excluded(100), Bound::Excluded(800));
        assert_eq!(ords, vec![2]);

        let ords = reader.numeric_range("size", Bound::Included(801), Bound::Unbounded);
        assert!(ords.is_empty());

        assert!(reader
            .numeric_range("absent", Bound::Unbounded, Bound::Unbounded)
            .is_empty());
    }

    #[test]
    fn test_empty_segment_rejected() {
        let storage = MemoryStorage::new();
        assert!(SegmentWriter::write(&storage, 1, &[]).is_err());
    }

    #[test]
    fn test_reconstruction_for_merge() {
        let storage = MemoryStorage::new();
        let meta = sample_segment(&storage);
        let reader = SegmentReader::open(&storage, meta).unwrap();

        let docs = reader.to_analyzed_docs();
        assert_eq!(docs.len(), 3);
        let (doc_id, doc) = &docs[2];
        assert_eq!(*doc_id, 5);
        assert_eq!(doc.terms.get(&Term::new("title", "apache")), Some(&2));
        assert_eq!(doc.numerics.get("size"), Some(&450));
        assert_eq!(doc.field_lengths.get("title"), Some(&3));
    }
}
