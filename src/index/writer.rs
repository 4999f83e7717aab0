//! Index writer: the single mutator of a store.
//!
//! At most one writer exists per store, enforced by an exclusive lock file.
//! The writer owns an in-memory buffer of analyzed documents and a queue of
//! delete terms; nothing becomes visible to readers before
//! [`IndexWriter::commit`]. Public methods take `&self` and serialize
//! through an internal mutex, so the writer is safe to share across
//! threads.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::analysis::Analyzer;
use crate::document::{Document, FieldValue};
use crate::error::{Result, SedumError};
use crate::index::commit::CommitDescriptor;
use crate::index::deletes::LiveDocs;
use crate::index::log::{WalRecord, WriteAheadLog};
use crate::index::merge::MergePolicy;
use crate::index::postings::Term;
use crate::index::segment::{AnalyzedDoc, SegmentReader, SegmentWriter};
use crate::schema::{FieldType, Schema};
use crate::storage::{Storage, StorageLock};

/// File name of the writer's exclusive lock.
pub const WRITE_LOCK_FILE: &str = "write.lock";

const LOCK_ATTEMPTS: u32 = 3;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(50);

/// The single mutator of an index store.
///
/// Created through [`crate::index::Index::writer`]. Buffered operations are
/// logged to a write-ahead log before they are applied, so a crashed
/// process recovers its uncommitted work when the next writer opens.
pub struct IndexWriter {
    storage: Arc<dyn Storage>,
    schema: Arc<Schema>,
    analyzer: Arc<dyn Analyzer>,
    merge_policy: MergePolicy,
    state: Mutex<WriterState>,
    _lock: Box<dyn StorageLock>,
}

impl std::fmt::Debug for IndexWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexWriter")
            .field("schema", &self.schema)
            .finish()
    }
}

#[derive(Debug)]
struct WriterState {
    buffer: Vec<AnalyzedDoc>,
    pending_deletes: Vec<Term>,
    pending_delete_all: bool,
    wal: WriteAheadLog,
    commit: CommitDescriptor,
}

impl IndexWriter {
    /// Open the writer, acquiring the store's exclusive write lock.
    ///
    /// Lock acquisition retries a bounded number of times before surfacing
    /// [`SedumError::StoreLocked`]. Uncommitted write-log records from a
    /// crashed predecessor are replayed into the buffer.
    pub(crate) fn open(
        storage: Arc<dyn Storage>,
        schema: Arc<Schema>,
        analyzer: Arc<dyn Analyzer>,
        merge_policy: MergePolicy,
    ) -> Result<Self> {
        let lock = Self::acquire_lock(storage.as_ref())?;
        let commit =
            CommitDescriptor::load(storage.as_ref())?.unwrap_or_else(CommitDescriptor::empty);

        let writer = IndexWriter {
            storage,
            schema,
            analyzer,
            merge_policy,
            state: Mutex::new(WriterState {
                buffer: Vec::new(),
                pending_deletes: Vec::new(),
                pending_delete_all: false,
                wal: WriteAheadLog::new(),
                commit,
            }),
            _lock: lock,
        };

        let records = WriteAheadLog::read_all(writer.storage.as_ref())?;
        if !records.is_empty() {
            let mut state = writer.state.lock();
            let current = state.commit.generation;
            let mut replayed = 0u64;
            for record in records {
                // A record based on an older generation was already folded
                // into a published commit before the log could be cleared.
                if record.generation >= current {
                    writer.apply_record(&mut state, record.entry);
                    replayed += 1;
                }
            }
            log::info!("replayed {replayed} uncommitted write-log records");
        }

        Ok(writer)
    }

    fn acquire_lock(storage: &dyn Storage) -> Result<Box<dyn StorageLock>> {
        let mut attempt = 0;
        loop {
            match storage.try_lock(WRITE_LOCK_FILE) {
                Ok(lock) => return Ok(lock),
                Err(e @ SedumError::StoreLocked(_)) => {
                    attempt += 1;
                    if attempt >= LOCK_ATTEMPTS {
                        return Err(e);
                    }
                    std::thread::sleep(LOCK_RETRY_DELAY);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Analyze, validate and buffer a document.
    ///
    /// No durability guarantee is given until [`IndexWriter::commit`]; the
    /// operation is, however, recorded in the write-ahead log so an open
    /// writer after a crash resumes with it in the buffer.
    pub fn add_document(&self, doc: Document) -> Result<()> {
        self.schema.validate(&doc)?;
        let mut state = self.state.lock();
        let record = WalRecord::Add { document: doc };
        let generation = state.commit.generation;
        state.wal.append(self.storage.as_ref(), generation, &record)?;
        self.apply_record(&mut state, record);
        Ok(())
    }

    /// Logically delete every visible document whose `term.field` contains
    /// exactly `term.token`.
    ///
    /// Matching buffered documents are removed immediately; matches in
    /// committed segments are marked at commit time. Zero matches is not an
    /// error. Returns the number of buffered documents removed.
    pub fn delete_documents(&self, term: &Term) -> Result<u64> {
        let mut state = self.state.lock();
        let record = WalRecord::Delete {
            field: term.field.clone(),
            token: term.token.clone(),
        };
        let generation = state.commit.generation;
        state.wal.append(self.storage.as_ref(), generation, &record)?;
        Ok(self.apply_record(&mut state, record))
    }

    /// Replace every document matching `term` with `doc`.
    ///
    /// Internally a delete followed by an add, but logged as one durable
    /// record: recovery after a crash mid-update applies both halves or
    /// neither. When nothing matches, `doc` is still added.
    pub fn update_document(&self, term: &Term, doc: Document) -> Result<()> {
        self.schema.validate(&doc)?;
        let mut state = self.state.lock();
        let record = WalRecord::Replace {
            field: term.field.clone(),
            token: term.token.clone(),
            document: doc,
        };
        let generation = state.commit.generation;
        state.wal.append(self.storage.as_ref(), generation, &record)?;
        self.apply_record(&mut state, record);
        Ok(())
    }

    /// Drop every document in the store, buffered and committed alike.
    pub fn delete_all(&self) -> Result<()> {
        let mut state = self.state.lock();
        let record = WalRecord::DeleteAll;
        let generation = state.commit.generation;
        state.wal.append(self.storage.as_ref(), generation, &record)?;
        self.apply_record(&mut state, record);
        Ok(())
    }

    /// Number of documents buffered since the last commit.
    pub fn pending_docs(&self) -> u64 {
        self.state.lock().buffer.len() as u64
    }

    /// Flush the buffer into a new segment (if non-empty), apply queued
    /// deletes, and atomically publish the new commit.
    ///
    /// Calling commit with nothing pending is a no-op, so repeating a
    /// commit yields an identical segment list. A failed flush discards the
    /// partial segment and leaves the previous commit as the valid state.
    pub fn commit(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.commit_locked(&mut state)?;
        if self.merge_policy.should_merge(&state.commit.segments) {
            self.merge_locked(&mut state)?;
        }
        Ok(())
    }

    /// Discard all uncommitted operations.
    pub fn rollback(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.buffer.clear();
        state.pending_deletes.clear();
        state.pending_delete_all = false;
        state.wal.clear(self.storage.as_ref())
    }

    /// Merge all segments into one, physically dropping deleted documents.
    ///
    /// Pending changes are committed first. Global document IDs are
    /// preserved across the merge.
    pub fn force_merge(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.commit_locked(&mut state)?;
        self.merge_locked(&mut state)
    }

    /// Commit pending changes and release the writer lock.
    ///
    /// Consuming the writer is what releases the lock; dropping without
    /// close abandons buffered work to the write-ahead log instead of
    /// committing it.
    pub fn close(self) -> Result<()> {
        let mut state = self.state.lock();
        self.commit_locked(&mut state)
    }

    /// Apply a durable record to the in-memory state. Returns the number of
    /// buffered documents a delete removed (0 for other records).
    fn apply_record(&self, state: &mut WriterState, record: WalRecord) -> u64 {
        match record {
            WalRecord::Add { document } => {
                let analyzed = self.analyze(&document);
                state.buffer.push(analyzed);
                0
            }
            WalRecord::Delete { field, token } => {
                let term = Term::new(field, token);
                let before = state.buffer.len();
                state.buffer.retain(|doc| !doc.matches(&term));
                let removed = (before - state.buffer.len()) as u64;
                state.pending_deletes.push(term);
                removed
            }
            WalRecord::Replace {
                field,
                token,
                document,
            } => {
                let term = Term::new(field, token);
                state.buffer.retain(|doc| !doc.matches(&term));
                state.pending_deletes.push(term);
                let analyzed = self.analyze(&document);
                state.buffer.push(analyzed);
                0
            }
            WalRecord::DeleteAll => {
                state.buffer.clear();
                state.pending_deletes.clear();
                state.pending_delete_all = true;
                0
            }
        }
    }

    /// Analyze a validated document into its buffered form.
    fn analyze(&self, doc: &Document) -> AnalyzedDoc {
        let mut analyzed = AnalyzedDoc::default();
        for (name, value) in &doc.fields {
            let Some(options) = self.schema.field(name) else {
                continue;
            };
            if options.stored {
                analyzed.stored.fields.insert(name.clone(), value.clone());
            }
            if !options.indexed {
                continue;
            }
            match (options.field_type, value) {
                (FieldType::Text, FieldValue::Text(text)) => {
                    let tokens = self.analyzer.analyze(text);
                    analyzed
                        .field_lengths
                        .insert(name.clone(), tokens.len() as u32);
                    for token in tokens {
                        *analyzed
                            .terms
                            .entry(Term::new(name.clone(), token.text))
                            .or_insert(0) += 1;
                    }
                }
                (FieldType::Numeric, FieldValue::Numeric(n)) => {
                    // Numerics index their canonical decimal token so
                    // term-based delete and update work uniformly.
                    analyzed.numerics.insert(name.clone(), *n);
                    analyzed.terms.insert(Term::new(name.clone(), n.to_string()), 1);
                }
                _ => {}
            }
        }
        analyzed
    }

    fn commit_locked(&self, state: &mut WriterState) -> Result<()> {
        if state.buffer.is_empty()
            && state.pending_deletes.is_empty()
            && !state.pending_delete_all
        {
            return Ok(());
        }

        let storage = self.storage.as_ref();
        let mut next = state.commit.clone();
        next.generation += 1;
        let mut obsolete: Vec<String> = Vec::new();

        if state.pending_delete_all {
            for segment in &next.segments {
                obsolete.extend(segment.file_names());
            }
            next.segments.clear();
        }

        // Queued delete terms flip bits in fresh generation-stamped bitmaps;
        // the segments themselves are untouched.
        if !state.pending_deletes.is_empty() && !next.segments.is_empty() {
            for meta in &mut next.segments {
                let reader = SegmentReader::open(storage, meta.clone())?;
                let mut live = reader
                    .live_docs()
                    .cloned()
                    .unwrap_or_else(|| LiveDocs::new(meta.doc_count));
                let mut changed = false;
                for term in &state.pending_deletes {
                    if let Some(postings) = reader.postings(term) {
                        for posting in postings.iter() {
                            changed |= live.delete(posting.ordinal);
                        }
                    }
                }
                if changed {
                    live.write(storage, &meta.del_file_name(next.generation))?;
                    if let Some(old_gen) = meta.del_gen {
                        obsolete.push(meta.del_file_name(old_gen));
                    }
                    meta.del_gen = Some(next.generation);
                    meta.deleted_docs = live.deleted_count();
                }
            }
        }

        if !state.buffer.is_empty() {
            let mut docs = Vec::with_capacity(state.buffer.len());
            let mut doc_id = next.next_doc_id;
            for analyzed in &state.buffer {
                docs.push((doc_id, analyzed.clone()));
                doc_id += 1;
            }
            let meta = SegmentWriter::write(storage, next.next_segment_id, &docs)?;
            next.next_doc_id = doc_id;
            next.next_segment_id += 1;
            next.segments.push(meta);
        }

        next.publish(storage)?;

        state.buffer.clear();
        state.pending_deletes.clear();
        state.pending_delete_all = false;
        state.wal.clear(storage)?;
        state.commit = next;

        for name in obsolete {
            if let Err(e) = storage.delete_file(&name) {
                log::warn!("could not delete obsolete file '{name}': {e}");
            }
        }
        log::info!(
            "commit generation {} complete ({} segments)",
            state.commit.generation,
            state.commit.segments.len()
        );
        Ok(())
    }

    fn merge_locked(&self, state: &mut WriterState) -> Result<()> {
        let has_deletions = state.commit.segments.iter().any(|s| s.has_deletions());
        if state.commit.segments.len() <= 1 && !has_deletions {
            return Ok(());
        }

        let storage = self.storage.as_ref();
        let mut merged = Vec::new();
        let mut obsolete = Vec::new();
        for meta in &state.commit.segments {
            let reader = SegmentReader::open(storage, meta.clone())?;
            merged.extend(reader.to_analyzed_docs());
            obsolete.extend(meta.file_names());
        }
        merged.sort_by_key(|(doc_id, _)| *doc_id);

        let mut next = state.commit.clone();
        next.generation += 1;
        if merged.is_empty() {
            next.segments.clear();
        } else {
            let meta = SegmentWriter::write(storage, next.next_segment_id, &merged)?;
            next.next_segment_id += 1;
            next.segments = vec![meta];
        }
        next.publish(storage)?;
        state.commit = next;

        for name in obsolete {
            if let Err(e) = storage.delete_file(&name) {
                log::warn!("could not delete merged-away file '{name}': {e}");
            }
        }
        log::info!(
            "merged store into {} segment(s) at generation {}",
            state.commit.segments.len(),
            state.commit.generation
        );
        Ok(())
    }
}
