//! In-process store used by tests and local development.
//!
//! Implements both [`NativeStore`] and [`RestStore`] over a single map keyed
//! by document path, so data written through the native path is visible
//! through the degraded path and vice versa. Call counters let tests assert
//! which path served a request.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use skincare_admin_core::{Document, FieldValue, Fields};

use super::connection::{ConnectionStrategy, Connector};
use super::{
    CollectionPath, Direction, DocumentPath, NativeStore, Order, Query, RestStore, StoreError,
    StoreResult, Write,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory document store.
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<BTreeMap<DocumentPath, Fields>>,
    failing_documents: Mutex<HashSet<DocumentPath>>,
    rest_unavailable: AtomicBool,
    query_latency: Mutex<Duration>,
    native_calls: AtomicUsize,
    rest_calls: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document directly, bypassing call counters.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] if `path` is not a document path.
    pub fn insert(&self, path: &str, fields: Fields) -> StoreResult<()> {
        let path = DocumentPath::parse(path)?;
        lock(&self.documents).insert(path, fields);
        Ok(())
    }

    /// Raw stored fields of a document.
    #[must_use]
    pub fn fields(&self, path: &str) -> Option<Fields> {
        let path = DocumentPath::parse(path).ok()?;
        lock(&self.documents).get(&path).cloned()
    }

    /// Number of documents directly inside `collection`.
    #[must_use]
    pub fn count(&self, collection: &str) -> usize {
        CollectionPath::parse(collection).map_or(0, |collection| {
            lock(&self.documents)
                .keys()
                .filter(|path| path.parent() == collection)
                .count()
        })
    }

    /// Make every write to `path` fail with an API error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] if `path` is not a document path.
    pub fn fail_writes_to(&self, path: &str) -> StoreResult<()> {
        lock(&self.failing_documents).insert(DocumentPath::parse(path)?);
        Ok(())
    }

    /// Toggle the REST path; when off every REST call fails.
    pub fn set_rest_available(&self, available: bool) {
        self.rest_unavailable
            .store(!available, AtomicOrdering::SeqCst);
    }

    /// Delay every native query by `latency` before it reads the map.
    pub fn set_query_latency(&self, latency: Duration) {
        *lock(&self.query_latency) = latency;
    }

    #[must_use]
    pub fn native_calls(&self) -> usize {
        self.native_calls.load(AtomicOrdering::SeqCst)
    }

    #[must_use]
    pub fn rest_calls(&self) -> usize {
        self.rest_calls.load(AtomicOrdering::SeqCst)
    }

    fn collection_documents(&self, collection: &CollectionPath) -> Vec<Document> {
        lock(&self.documents)
            .iter()
            .filter(|(path, _)| path.parent() == *collection)
            .map(|(path, fields)| Document::new(path.id(), fields.clone()))
            .collect()
    }

    fn rest_call(&self) -> StoreResult<()> {
        self.rest_calls.fetch_add(1, AtomicOrdering::SeqCst);
        if self.rest_unavailable.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Api {
                status: 503,
                message: "REST store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

/// Type rank used to order values of different kinds.
const fn type_rank(value: &FieldValue) -> u8 {
    match value {
        FieldValue::Null => 0,
        FieldValue::Boolean(_) => 1,
        FieldValue::Integer(_) | FieldValue::Double(_) => 2,
        FieldValue::Timestamp(_) => 3,
        FieldValue::String(_) => 4,
        FieldValue::Array(_) => 5,
        FieldValue::Map(_) => 6,
    }
}

fn compare_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    match (a, b) {
        (FieldValue::Boolean(x), FieldValue::Boolean(y)) => x.cmp(y),
        (FieldValue::Timestamp(x), FieldValue::Timestamp(y)) => x.cmp(y),
        (FieldValue::String(x), FieldValue::String(y)) => x.cmp(y),
        _ => match (a.as_f64(), b.as_f64(), type_rank(a) == type_rank(b)) {
            (Some(x), Some(y), true) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => type_rank(a).cmp(&type_rank(b)),
        },
    }
}

fn apply_timestamps(fields: &mut Fields, server_timestamps: &[String]) {
    let now = Utc::now();
    for name in server_timestamps {
        fields.insert(name.clone(), FieldValue::Timestamp(now));
    }
}

#[async_trait]
impl NativeStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn run_query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        self.native_calls.fetch_add(1, AtomicOrdering::SeqCst);
        let latency = *lock(&self.query_latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let mut documents = self.collection_documents(&query.collection);

        match &query.order {
            Order::Unordered | Order::ById => documents.sort_by(|a, b| a.id.cmp(&b.id)),
            Order::Field { path, direction } => {
                documents.retain(|doc| doc.get(path).is_some());
                documents.sort_by(|a, b| {
                    let ordering = match (a.get(path), b.get(path)) {
                        (Some(x), Some(y)) => compare_values(x, y),
                        _ => Ordering::Equal,
                    };
                    match direction {
                        Direction::Ascending => ordering,
                        Direction::Descending => ordering.reverse(),
                    }
                });
            }
        }

        if let Some(cursor) = &query.start_after {
            if query.order != Order::ById {
                return Err(StoreError::Api {
                    status: 400,
                    message: "id cursor requires id ordering".to_string(),
                });
            }
            documents.retain(|doc| doc.id.as_str() > cursor.as_str());
        }

        documents.truncate(query.limit);
        Ok(documents)
    }

    async fn get(&self, document: &DocumentPath) -> StoreResult<Option<Document>> {
        self.native_calls.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(lock(&self.documents)
            .get(document)
            .map(|fields| Document::new(document.id(), fields.clone())))
    }

    async fn commit(&self, writes: Vec<Write>) -> StoreResult<()> {
        self.native_calls.fetch_add(1, AtomicOrdering::SeqCst);
        let mut documents = lock(&self.documents);
        let failing = lock(&self.failing_documents);

        // Check every precondition before applying anything.
        for write in &writes {
            let path = write.document();
            if failing.contains(path) {
                return Err(StoreError::Api {
                    status: 500,
                    message: format!("write to {path} rejected"),
                });
            }
            if matches!(write, Write::Create { .. }) && documents.contains_key(path) {
                return Err(StoreError::AlreadyExists(path.to_string()));
            }
        }

        for write in writes {
            match write {
                Write::Create {
                    document,
                    mut fields,
                    server_timestamps,
                }
                | Write::Set {
                    document,
                    mut fields,
                    server_timestamps,
                } => {
                    apply_timestamps(&mut fields, &server_timestamps);
                    documents.insert(document, fields);
                }
                Write::Merge {
                    document,
                    fields,
                    server_timestamps,
                } => {
                    let existing = documents.entry(document).or_default();
                    existing.extend(fields);
                    apply_timestamps(existing, &server_timestamps);
                }
                Write::Delete { document } => {
                    documents.remove(&document);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RestStore for MemoryStore {
    async fn list_page(
        &self,
        collection: &CollectionPath,
        page_size: usize,
    ) -> StoreResult<Vec<Document>> {
        self.rest_call()?;
        let mut documents = self.collection_documents(collection);
        documents.truncate(page_size);
        Ok(documents)
    }

    async fn get(&self, document: &DocumentPath) -> StoreResult<Option<Document>> {
        self.rest_call()?;
        Ok(lock(&self.documents)
            .get(document)
            .map(|fields| Document::new(document.id(), fields.clone())))
    }

    async fn delete(&self, document: &DocumentPath) -> StoreResult<()> {
        self.rest_call()?;
        lock(&self.documents).remove(document);
        Ok(())
    }

    async fn probe(&self) -> StoreResult<()> {
        self.rest_call()
    }
}

/// Connector over a [`MemoryStore`] with configurable strategy failures.
pub struct MemoryConnector {
    store: Arc<MemoryStore>,
    failing: Mutex<Vec<ConnectionStrategy>>,
    attempts: Mutex<Vec<ConnectionStrategy>>,
}

impl MemoryConnector {
    #[must_use]
    pub const fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            failing: Mutex::new(Vec::new()),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Make the given strategies fail to connect.
    #[must_use]
    pub fn fail_strategies(self, strategies: &[ConnectionStrategy]) -> Self {
        lock(&self.failing).extend_from_slice(strategies);
        self
    }

    /// Let every strategy connect again.
    pub fn recover(&self) {
        lock(&self.failing).clear();
    }

    /// Strategies attempted so far, in order.
    #[must_use]
    pub fn attempts(&self) -> Vec<ConnectionStrategy> {
        lock(&self.attempts).clone()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect_native(
        &self,
        strategy: ConnectionStrategy,
    ) -> StoreResult<Arc<dyn NativeStore>> {
        lock(&self.attempts).push(strategy);
        if lock(&self.failing).contains(&strategy) {
            return Err(StoreError::Api {
                status: 503,
                message: format!("{strategy} transport unavailable"),
            });
        }
        Ok(self.store.clone())
    }

    fn degraded(&self) -> Arc<dyn RestStore> {
        self.store.clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store_with_products(ids: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        for id in ids {
            store.insert(&format!("products/{id}"), Fields::new()).unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_query_cursor_and_limit() {
        let store = store_with_products(&["c", "a", "d", "b"]);
        let products = CollectionPath::parse("products").unwrap();
        let query = Query::new(products, 2)
            .order(Order::ById)
            .start_after(Some("a".to_string()));

        let docs = store.run_query(&query).await.unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_field_order_excludes_missing() {
        let store = MemoryStore::new();
        store
            .insert("users/u1", Fields::from([("createdAt".into(), FieldValue::from("2024-01-01"))]))
            .unwrap();
        store
            .insert("users/u2", Fields::from([("createdAt".into(), FieldValue::from("2024-03-01"))]))
            .unwrap();
        store.insert("users/u3", Fields::new()).unwrap();

        let users = CollectionPath::parse("users").unwrap();
        let docs = store
            .run_query(&Query::new(users, 10).order(Order::newest_first("createdAt")))
            .await
            .unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["u2", "u1"]);
    }

    #[tokio::test]
    async fn test_create_precondition() {
        let store = store_with_products(&["p1"]);
        let write = Write::Create {
            document: DocumentPath::parse("products/p1").unwrap(),
            fields: Fields::new(),
            server_timestamps: vec!["createdAt".into()],
        };
        assert!(matches!(
            store.commit(vec![write]).await,
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_subcollections_are_separate() {
        let store = MemoryStore::new();
        store.insert("users/u1", Fields::new()).unwrap();
        store.insert("users/u1/skinAnalysis/a1", Fields::new()).unwrap();

        assert_eq!(store.count("users"), 1);
        assert_eq!(store.count("users/u1/skinAnalysis"), 1);
    }
}
