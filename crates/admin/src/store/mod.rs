//! Remote document store access.
//!
//! Two capability sets sit behind traits so the data layer never knows which
//! concrete client it is talking to:
//!
//! - [`NativeStore`]: structured queries, single-document reads and atomic
//!   commits (creates, merges, overwrites, deletes, server timestamps).
//! - [`RestStore`]: the degraded path. Plain page listing, document GET and
//!   DELETE only. No ordering, no cursors, no writes.
//!
//! [`connection`] decides which one is live for the process.

pub mod connection;
mod http;
pub mod memory;
pub mod native;
pub mod rest;
pub mod value;

pub use connection::{
    Connection, ConnectionManager, ConnectionStatus, ConnectionStrategy, Connector,
    FirestoreConnector, initialize,
};
pub use http::StoreEndpoint;
pub use memory::{MemoryConnector, MemoryStore};
pub use native::FirestoreClient;
pub use rest::RestClient;

use std::fmt;

use async_trait::async_trait;
use skincare_admin_core::{Document, Fields};
use thiserror::Error;

/// Errors that can occur when talking to the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Store returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Collection or document path is malformed.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Operation is not available on the degraded connection.
    #[error("{0} is not available in degraded mode")]
    Unsupported(&'static str),

    /// Document does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Create precondition failed.
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

fn split_path(raw: &str) -> StoreResult<Vec<&str>> {
    let trimmed = raw.trim_matches('/');
    let segments: Vec<&str> = trimmed.split('/').collect();
    if trimmed.is_empty()
        || segments
            .iter()
            .any(|s| s.is_empty() || *s == "." || *s == "..")
    {
        return Err(StoreError::InvalidPath(raw.to_string()));
    }
    Ok(segments)
}

/// Slash-separated path to a collection (odd number of segments).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Parse a collection path such as `users` or `users/u1/skinAnalysis`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] for empty segments or an even
    /// segment count.
    pub fn parse(raw: &str) -> StoreResult<Self> {
        let segments = split_path(raw)?;
        if segments.len() % 2 == 0 {
            return Err(StoreError::InvalidPath(raw.to_string()));
        }
        Ok(Self(segments.join("/")))
    }

    /// Path of the document `id` inside this collection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] if `id` is empty or contains `/`.
    pub fn doc(&self, id: &str) -> StoreResult<DocumentPath> {
        if id.is_empty() || id.contains('/') || id == "." || id == ".." {
            return Err(StoreError::InvalidPath(format!("{}/{id}", self.0)));
        }
        Ok(DocumentPath(format!("{}/{id}", self.0)))
    }

    /// Last segment, the collection id used in structured queries.
    #[must_use]
    pub fn collection_id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Path of the owning document, `None` for root collections.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.0.rsplit_once('/').map(|(parent, _)| parent)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Slash-separated path to a document (even number of segments).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath(String);

impl DocumentPath {
    /// Parse a document path such as `users/u1`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] for empty segments or an odd
    /// segment count.
    pub fn parse(raw: &str) -> StoreResult<Self> {
        let segments = split_path(raw)?;
        if segments.len() % 2 == 1 {
            return Err(StoreError::InvalidPath(raw.to_string()));
        }
        Ok(Self(segments.join("/")))
    }

    /// Sub-collection `name` under this document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] if `name` is not a single segment.
    pub fn collection(&self, name: &str) -> StoreResult<CollectionPath> {
        CollectionPath::parse(&format!("{}/{name}", self.0))
    }

    /// Document id (last segment).
    #[must_use]
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Collection containing this document.
    #[must_use]
    pub fn parent(&self) -> CollectionPath {
        let parent = self.0.rsplit_once('/').map_or("", |(parent, _)| parent);
        CollectionPath(parent.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sort direction for field ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Result ordering for a [`Query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    /// Store-defined order.
    Unordered,
    /// Ascending by document id. Required for id cursors.
    ById,
    /// By a field value. Documents missing the field are excluded.
    Field { path: String, direction: Direction },
}

impl Order {
    /// Newest first on a timestamp field.
    #[must_use]
    pub fn newest_first(field: &str) -> Self {
        Self::Field {
            path: field.to_string(),
            direction: Direction::Descending,
        }
    }
}

/// A structured query over one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub collection: CollectionPath,
    pub order: Order,
    /// Document id to resume after. Only valid with [`Order::ById`].
    pub start_after: Option<String>,
    pub limit: usize,
}

impl Query {
    #[must_use]
    pub const fn new(collection: CollectionPath, limit: usize) -> Self {
        Self {
            collection,
            order: Order::Unordered,
            start_after: None,
            limit,
        }
    }

    #[must_use]
    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn start_after(mut self, cursor: Option<String>) -> Self {
        self.start_after = cursor;
        self
    }
}

/// One mutation inside a native commit.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Create a document that must not exist yet.
    Create {
        document: DocumentPath,
        fields: Fields,
        server_timestamps: Vec<String>,
    },
    /// Create or update, touching only the listed fields.
    Merge {
        document: DocumentPath,
        fields: Fields,
        server_timestamps: Vec<String>,
    },
    /// Create or replace the whole document.
    Set {
        document: DocumentPath,
        fields: Fields,
        server_timestamps: Vec<String>,
    },
    /// Delete the document. Sub-collections are untouched.
    Delete { document: DocumentPath },
}

impl Write {
    #[must_use]
    pub const fn document(&self) -> &DocumentPath {
        match self {
            Self::Create { document, .. }
            | Self::Merge { document, .. }
            | Self::Set { document, .. }
            | Self::Delete { document } => document,
        }
    }
}

/// Full-featured store client.
#[async_trait]
pub trait NativeStore: Send + Sync {
    /// Short backend label for logs.
    fn backend(&self) -> &'static str;

    /// Run a structured query.
    async fn run_query(&self, query: &Query) -> StoreResult<Vec<Document>>;

    /// Fetch one document, `None` when absent.
    async fn get(&self, document: &DocumentPath) -> StoreResult<Option<Document>>;

    /// Apply writes atomically.
    async fn commit(&self, writes: Vec<Write>) -> StoreResult<()>;
}

/// Degraded REST store client.
#[async_trait]
pub trait RestStore: Send + Sync {
    /// First page of a collection in store-defined order.
    async fn list_page(
        &self,
        collection: &CollectionPath,
        page_size: usize,
    ) -> StoreResult<Vec<Document>>;

    /// Fetch one document, `None` when absent.
    async fn get(&self, document: &DocumentPath) -> StoreResult<Option<Document>>;

    async fn delete(&self, document: &DocumentPath) -> StoreResult<()>;

    /// Cheap connectivity check.
    async fn probe(&self) -> StoreResult<()>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_path_parsing() {
        let users = CollectionPath::parse("users").unwrap();
        assert_eq!(users.collection_id(), "users");
        assert_eq!(users.parent(), None);

        let analyses = CollectionPath::parse("/users/u1/skinAnalysis/").unwrap();
        assert_eq!(analyses.as_str(), "users/u1/skinAnalysis");
        assert_eq!(analyses.collection_id(), "skinAnalysis");
        assert_eq!(analyses.parent(), Some("users/u1"));

        assert!(CollectionPath::parse("users/u1").is_err());
        assert!(CollectionPath::parse("").is_err());
        assert!(CollectionPath::parse("users//x").is_err());
    }

    #[test]
    fn test_document_path_parsing() {
        let doc = CollectionPath::parse("users").unwrap().doc("u1").unwrap();
        assert_eq!(doc.as_str(), "users/u1");
        assert_eq!(doc.id(), "u1");
        assert_eq!(doc.parent().as_str(), "users");
        assert_eq!(
            doc.collection("skinAnalysis").unwrap().as_str(),
            "users/u1/skinAnalysis"
        );

        assert!(DocumentPath::parse("users").is_err());
        assert!(CollectionPath::parse("users").unwrap().doc("a/b").is_err());
        assert!(CollectionPath::parse("users").unwrap().doc("..").is_err());
    }
}
