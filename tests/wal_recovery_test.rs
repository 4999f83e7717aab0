//! Crash recovery, commit durability, and writer locking, exercised
//! against the filesystem backend.

use std::io::Write;
use std::sync::Arc;

use tempfile::TempDir;

use sedum::{
    Document, FileStorage, Index, MatchAllQuery, MemoryStorage, Schema, SedumError,
    StandardAnalyzer, Term, TermQuery,
};

fn schema() -> Schema {
    Schema::builder()
        .add_text_field("name")
        .add_text_field("body")
        .build()
}

fn open_file_index(dir: &TempDir) -> Index {
    Index::open_or_create(
        Arc::new(FileStorage::new(dir.path()).unwrap()),
        schema(),
        Arc::new(StandardAnalyzer::new()),
    )
    .unwrap()
}

#[test]
fn test_committed_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let index = open_file_index(&dir);
        let writer = index.writer().unwrap();
        writer
            .add_document(Document::new().add_text("name", "durable"))
            .unwrap();
        writer.commit().unwrap();
        writer.close().unwrap();
    }

    // A fresh process reconstructs the store purely from the durable
    // segment files plus the commit descriptor.
    let index = Index::open(
        Arc::new(FileStorage::new(dir.path()).unwrap()),
        Arc::new(StandardAnalyzer::new()),
    )
    .unwrap();
    let searcher = index.searcher().unwrap();
    assert_eq!(searcher.count(&TermQuery::new("name", "durable")).unwrap(), 1);
}

#[test]
fn test_uncommitted_adds_recovered_from_write_log() {
    let dir = TempDir::new().unwrap();
    let index = open_file_index(&dir);
    {
        let writer = index.writer().unwrap();
        writer
            .add_document(Document::new().add_text("name", "survivor"))
            .unwrap();
        // Crash: the writer is dropped without commit.
        drop(writer);
    }

    let writer = index.writer().unwrap();
    assert_eq!(writer.pending_docs(), 1);
    writer.commit().unwrap();
    writer.close().unwrap();

    let searcher = index.searcher().unwrap();
    assert_eq!(searcher.count(&TermQuery::new("name", "survivor")).unwrap(), 1);
}

#[test]
fn test_update_recovers_atomically() {
    let dir = TempDir::new().unwrap();
    let index = open_file_index(&dir);
    {
        let writer = index.writer().unwrap();
        writer
            .add_document(Document::new().add_text("name", "config").add_text("body", "v1"))
            .unwrap();
        writer.commit().unwrap();
        writer
            .update_document(
                &Term::new("name", "config"),
                Document::new().add_text("name", "config").add_text("body", "v2"),
            )
            .unwrap();
        // Crash before the commit. The update is one log record, so
        // recovery must yield delete-and-insert together, never a deleted
        // document with no replacement.
        drop(writer);
    }

    let writer = index.writer().unwrap();
    writer.commit().unwrap();
    writer.close().unwrap();

    let searcher = index.searcher().unwrap();
    assert_eq!(searcher.count(&MatchAllQuery::new()).unwrap(), 1);
    assert_eq!(searcher.count(&TermQuery::new("body", "v2")).unwrap(), 1);
}

#[test]
fn test_rollback_discards_log() {
    let dir = TempDir::new().unwrap();
    let index = open_file_index(&dir);
    let writer = index.writer().unwrap();
    writer
        .add_document(Document::new().add_text("name", "discarded"))
        .unwrap();
    writer.rollback().unwrap();
    writer.close().unwrap();

    // Nothing to recover, nothing committed.
    let writer = index.writer().unwrap();
    assert_eq!(writer.pending_docs(), 0);
    writer.close().unwrap();
    let searcher = index.searcher().unwrap();
    assert_eq!(searcher.count(&MatchAllQuery::new()).unwrap(), 0);
}

#[test]
fn test_second_writer_is_locked_out() {
    let dir = TempDir::new().unwrap();
    let index = open_file_index(&dir);
    let writer = index.writer().unwrap();

    let second = index.writer();
    assert!(matches!(second, Err(SedumError::StoreLocked(_))));

    writer.close().unwrap();
    index.writer().unwrap();
}

#[test]
fn test_corrupt_commit_descriptor_is_fatal() {
    let dir = TempDir::new().unwrap();
    let index = open_file_index(&dir);
    let writer = index.writer().unwrap();
    writer
        .add_document(Document::new().add_text("name", "present"))
        .unwrap();
    writer.commit().unwrap();
    writer.close().unwrap();

    // Scribble over the descriptor.
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .open(dir.path().join("commit.json"))
        .unwrap();
    file.write_all(b"garbage").unwrap();
    drop(file);

    assert!(matches!(
        index.reader(),
        Err(SedumError::CorruptCommit(_))
    ));
}

#[test]
fn test_missing_segment_file_is_corrupt() {
    let dir = TempDir::new().unwrap();
    let index = open_file_index(&dir);
    let writer = index.writer().unwrap();
    writer
        .add_document(Document::new().add_text("name", "present"))
        .unwrap();
    writer.commit().unwrap();
    writer.close().unwrap();

    std::fs::remove_file(dir.path().join("seg_000001.idx")).unwrap();

    assert!(matches!(
        index.reader(),
        Err(SedumError::CorruptCommit(_))
    ));
}

#[test]
fn test_reader_not_blocked_by_open_writer() {
    let index = Index::open_or_create(
        Arc::new(MemoryStorage::new()),
        schema(),
        Arc::new(StandardAnalyzer::new()),
    )
    .unwrap();

    let writer = index.writer().unwrap();
    writer
        .add_document(Document::new().add_text("name", "visible"))
        .unwrap();
    writer.commit().unwrap();

    // Readers need no lock and see the committed state while the writer
    // stays open with more buffered work.
    writer
        .add_document(Document::new().add_text("name", "buffered"))
        .unwrap();
    let searcher = index.searcher().unwrap();
    assert_eq!(searcher.count(&MatchAllQuery::new()).unwrap(), 1);
    writer.close().unwrap();
}
