//! Index store: facade plus the components it coordinates.

pub mod commit;
pub mod deletes;
pub mod log;
pub mod merge;
pub mod postings;
pub mod reader;
pub mod segment;
pub mod writer;

use std::sync::Arc;

use crate::analysis::Analyzer;
use crate::error::{Result, SedumError};
use crate::query::parser::QueryParser;
use crate::schema::Schema;
use crate::search::searcher::Searcher;
use crate::storage::Storage;
use crate::storage::structured::{StructReader, StructWriter};

pub use merge::MergePolicy;
pub use postings::{Posting, PostingList, Term};
pub use reader::{IndexReader, IndexStats};
pub use writer::IndexWriter;

const SCHEMA_FILE: &str = "schema.json";

/// Handle to one index store.
///
/// The `Index` owns the pieces every component must agree on: the storage
/// backend, the declared schema, and the one analyzer shared between the
/// write path and the query parser. Writers and readers are created from
/// it on demand.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use sedum::analysis::StandardAnalyzer;
/// use sedum::index::Index;
/// use sedum::query::TermQuery;
/// use sedum::schema::Schema;
/// use sedum::search::SearchRequest;
/// use sedum::storage::MemoryStorage;
/// use sedum::Document;
///
/// # fn main() -> sedum::Result<()> {
/// let schema = Schema::builder()
///     .add_text_field("title")
///     .default_field("title")
///     .build();
/// let index = Index::open_or_create(
///     Arc::new(MemoryStorage::new()),
///     schema,
///     Arc::new(StandardAnalyzer::new()),
/// )?;
///
/// let writer = index.writer()?;
/// writer.add_document(Document::new().add_text("title", "Hello World"))?;
/// writer.commit()?;
/// writer.close()?;
///
/// let searcher = index.searcher()?;
/// let results = searcher.search(
///     SearchRequest::new(Box::new(TermQuery::new("title", "hello"))).limit(5),
/// )?;
/// assert_eq!(results.total_hits, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Index {
    storage: Arc<dyn Storage>,
    schema: Arc<Schema>,
    analyzer: Arc<dyn Analyzer>,
    merge_policy: MergePolicy,
}

impl Index {
    /// Open the store at `storage`, creating it when empty.
    ///
    /// On first use the schema is persisted next to the segments. On later
    /// opens the declared schema must equal the stored one; a mismatch is a
    /// [`SedumError::SchemaViolation`].
    pub fn open_or_create(
        storage: Arc<dyn Storage>,
        schema: Schema,
        analyzer: Arc<dyn Analyzer>,
    ) -> Result<Self> {
        if storage.file_exists(SCHEMA_FILE) {
            let stored = load_schema(storage.as_ref())?;
            if stored != schema {
                return Err(SedumError::schema(
                    "declared schema does not match the schema stored in the index",
                ));
            }
        } else {
            save_schema(storage.as_ref(), &schema)?;
        }
        Ok(Index {
            storage,
            schema: Arc::new(schema),
            analyzer,
            merge_policy: MergePolicy::default(),
        })
    }

    /// Open an existing store, loading its persisted schema.
    pub fn open(storage: Arc<dyn Storage>, analyzer: Arc<dyn Analyzer>) -> Result<Self> {
        if !storage.file_exists(SCHEMA_FILE) {
            return Err(SedumError::index(
                "store has no schema; create the index first",
            ));
        }
        let schema = load_schema(storage.as_ref())?;
        Ok(Index {
            storage,
            schema: Arc::new(schema),
            analyzer,
            merge_policy: MergePolicy::default(),
        })
    }

    /// Replace the default merge policy.
    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    /// The declared schema.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The analyzer shared by the write path and the query parser.
    pub fn analyzer(&self) -> &Arc<dyn Analyzer> {
        &self.analyzer
    }

    /// The storage backend.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Open the store's writer, taking the exclusive write lock.
    pub fn writer(&self) -> Result<IndexWriter> {
        IndexWriter::open(
            Arc::clone(&self.storage),
            Arc::clone(&self.schema),
            Arc::clone(&self.analyzer),
            self.merge_policy.clone(),
        )
    }

    /// Open a point-in-time reader over the current commit.
    pub fn reader(&self) -> Result<IndexReader> {
        IndexReader::open(&self.storage, Arc::clone(&self.schema))
    }

    /// Open a searcher over the current commit.
    pub fn searcher(&self) -> Result<Searcher> {
        Ok(Searcher::new(Arc::new(self.reader()?)))
    }

    /// A query parser wired to this index's analyzer and default field.
    ///
    /// Using any other analyzer for query text would normalize terms
    /// differently than the index did and silently return nothing; always
    /// parse through this method.
    pub fn query_parser(&self) -> QueryParser {
        let mut parser = QueryParser::new(Arc::clone(&self.analyzer));
        if let Some(field) = self.schema.default_field() {
            parser = parser.with_default_field(field);
        }
        parser
    }
}

fn save_schema(storage: &dyn Storage, schema: &Schema) -> Result<()> {
    let mut writer = StructWriter::new(storage.create_output(SCHEMA_FILE)?);
    writer.write_bytes(&serde_json::to_vec(schema)?)?;
    writer.close()
}

fn load_schema(storage: &dyn Storage) -> Result<Schema> {
    let mut reader = StructReader::open(storage, SCHEMA_FILE)?;
    let payload = reader.read_bytes()?;
    Ok(serde_json::from_slice(&payload)?)
}
