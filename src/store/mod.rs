//! Document Store Boundary
//!
//! The engine reads collections through a `Session` which returns a `Cursor`
//! over the documents matching a filter document. `MemoryStore` is the
//! in-process implementation used by the shell and the tests.

pub mod filter;
pub mod memory;

use bson::Document;
use thiserror::Error;

pub use self::memory::MemoryStore;

/// Errors reported by a document store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("database '{0}' not found")]
    DatabaseNotFound(String),
    #[error("unsupported filter operator '{0}'")]
    UnsupportedOperator(String),
    #[error("malformed filter: {0}")]
    MalformedFilter(String),
    #[error("cursor closed")]
    CursorClosed,
    #[error("invalid document data: {0}")]
    InvalidData(String),
}

/// A read-only session against the store
pub trait Session: Send + Sync {
    /// Open a cursor over the documents of a collection matching `filter`.
    /// An unknown collection yields an empty cursor.
    fn find(&self, database: &str, collection: &str, filter: &Document) -> Result<Box<dyn Cursor>, StoreError>;
}

/// A forward-only stream of documents
pub trait Cursor: Send {
    /// The next document, `None` once exhausted
    fn next_document(&mut self) -> Option<Result<Document, StoreError>>;

    /// Release the cursor. Calling it more than once is harmless.
    fn close(&mut self) -> Result<(), StoreError>;
}
