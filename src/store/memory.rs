// In-Memory Document Store
//
// Collections of BSON documents held behind a read/write lock. `find`
// snapshots the matching documents, so cursors never hold the lock.

use std::collections::HashMap;

use bson::{Bson, Document};
use log::debug;
use parking_lot::{Mutex, RwLock};

use super::filter;
use super::{Cursor, Session, StoreError};

type Collections = HashMap<String, Vec<Document>>;

/// An in-memory `Session` implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    databases: RwLock<HashMap<String, Collections>>,
    /// Every (collection, filter) pair received by `find`
    find_log: Mutex<Vec<(String, Document)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append documents to a collection, creating it when needed
    pub fn insert(&self, database: &str, collection: &str, documents: Vec<Document>) {
        let mut databases = self.databases.write();
        databases
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
    }

    /// Load `{ database: { collection: [documents] } }` written as
    /// extended JSON
    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| StoreError::InvalidData(e.to_string()))?;
        let store = MemoryStore::new();

        let databases = value
            .as_object()
            .ok_or_else(|| StoreError::InvalidData("expected an object of databases".to_string()))?;
        for (database, collections) in databases {
            let collections = collections.as_object().ok_or_else(|| {
                StoreError::InvalidData(format!("database '{}' must map collection names to arrays", database))
            })?;
            for (collection, documents) in collections {
                let documents = documents.as_array().ok_or_else(|| {
                    StoreError::InvalidData(format!("collection '{}' must be an array", collection))
                })?;
                let parsed = documents
                    .iter()
                    .map(|d| match Bson::try_from(d.clone()) {
                        Ok(Bson::Document(doc)) => Ok(doc),
                        Ok(other) => Err(StoreError::InvalidData(format!("expected a document, got {}", other))),
                        Err(e) => Err(StoreError::InvalidData(e.to_string())),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                store.insert(database, collection, parsed);
            }
        }
        Ok(store)
    }

    /// Number of documents in a collection
    pub fn count(&self, database: &str, collection: &str) -> usize {
        self.databases
            .read()
            .get(database)
            .and_then(|c| c.get(collection))
            .map_or(0, |docs| docs.len())
    }

    /// Filters received by `find`, oldest first
    pub fn find_log(&self) -> Vec<(String, Document)> {
        self.find_log.lock().clone()
    }
}

impl Session for MemoryStore {
    fn find(&self, database: &str, collection: &str, filter_doc: &Document) -> Result<Box<dyn Cursor>, StoreError> {
        debug!("find {}.{} filter {}", database, collection, filter_doc);
        self.find_log.lock().push((collection.to_string(), filter_doc.clone()));

        let databases = self.databases.read();
        let documents = match databases.get(database).and_then(|c| c.get(collection)) {
            Some(docs) => docs,
            None => return Ok(Box::new(MemoryCursor::new(Vec::new()))),
        };

        let mut matched = Vec::new();
        for document in documents {
            if filter::matches(document, filter_doc)? {
                matched.push(document.clone());
            }
        }
        Ok(Box::new(MemoryCursor::new(matched)))
    }
}

/// Cursor over a snapshot of matching documents
pub struct MemoryCursor {
    documents: std::vec::IntoIter<Document>,
    closed: bool,
}

impl MemoryCursor {
    fn new(documents: Vec<Document>) -> Self {
        MemoryCursor {
            documents: documents.into_iter(),
            closed: false,
        }
    }
}

impl Cursor for MemoryCursor {
    fn next_document(&mut self) -> Option<Result<Document, StoreError>> {
        if self.closed {
            return Some(Err(StoreError::CursorClosed));
        }
        self.documents.next().map(Ok)
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.closed = true;
        Ok(())
    }
}
