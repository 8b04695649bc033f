//! Data access layer.
//!
//! Every operation asks the [`ConnectionManager`] for the live connection and
//! dispatches to the native or degraded store. Results are always normalized
//! [`Document`]s (or typed views built from them).
//!
//! Failure policy:
//! - reads log and return a neutral value (empty list, `None`, empty page);
//! - writes propagate the error, and fail with [`StoreError::Unsupported`] on
//!   a degraded connection except for delete.

mod pagination;

pub use pagination::{Page, PagerError, ProductPager};

use std::sync::Arc;

use futures::future::join_all;
use rand::Rng;
use skincare_admin_core::{
    Document, Fields, NewProduct, PRODUCT_FIELDS, Product, PromptHistoryEntry, PromptSetting,
};
use tracing::instrument;

use crate::store::{
    CollectionPath, Connection, ConnectionManager, DocumentPath, NativeStore, Order, Query,
    StoreError, StoreResult, Write,
};

pub const USERS: &str = "users";
pub const PRODUCTS: &str = "products";
pub const SKIN_ANALYSIS: &str = "skinAnalysis";
pub const PROMPT_SETTING: &str = "settings/skin_analysis_prompt";
pub const PROMPT_HISTORY: &str = "history";

/// Upper bound on prompt history entries returned.
const PROMPT_HISTORY_LIMIT: usize = 100;

/// Length of generated document ids.
const AUTO_ID_LENGTH: usize = 20;

/// Generate a 20-character alphanumeric document id.
#[must_use]
pub fn auto_id() -> String {
    rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(AUTO_ID_LENGTH)
        .map(char::from)
        .collect()
}

/// Store-agnostic data access.
#[derive(Clone)]
pub struct DataAccess {
    connections: Arc<ConnectionManager>,
}

impl DataAccess {
    #[must_use]
    pub const fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }

    #[must_use]
    pub const fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    async fn try_list(
        &self,
        collection: &CollectionPath,
        limit: usize,
        order: Order,
    ) -> StoreResult<Vec<Document>> {
        match self.connections.connection().await {
            Connection::Native { store, .. } => {
                let query = Query::new(collection.clone(), limit).order(order);
                store.run_query(&query).await
            }
            Connection::Degraded(rest) => {
                let mut documents = rest.list_page(collection, limit).await?;
                documents.truncate(limit);
                Ok(documents)
            }
        }
    }

    /// Up to `limit` documents of a collection.
    ///
    /// `order` is honored on the native path only; the degraded path returns
    /// the first REST page in store order.
    #[instrument(skip(self, order), fields(collection = %collection))]
    pub async fn list(
        &self,
        collection: &CollectionPath,
        limit: usize,
        order: Order,
    ) -> Vec<Document> {
        self.try_list(collection, limit, order)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to list collection");
                Vec::new()
            })
    }

    /// One document, `None` when absent or on failure.
    #[instrument(skip(self), fields(document = %document))]
    pub async fn get(&self, document: &DocumentPath) -> Option<Document> {
        let result = match self.connections.connection().await {
            Connection::Native { store, .. } => store.get(document).await,
            Connection::Degraded(rest) => rest.get(document).await,
        };
        result.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to fetch document");
            None
        })
    }

    /// Up to `limit` products with normalized field names.
    pub async fn list_products(&self, limit: usize) -> Vec<Product> {
        let Ok(products) = CollectionPath::parse(PRODUCTS) else {
            return Vec::new();
        };
        self.list(&products, limit, Order::Unordered)
            .await
            .into_iter()
            .map(normalize_product)
            .collect()
    }

    /// One product with normalized field names.
    pub async fn get_product(&self, id: &str) -> Option<Product> {
        let path = CollectionPath::parse(PRODUCTS).and_then(|c| c.doc(id)).ok()?;
        self.get(&path).await.map(normalize_product)
    }

    /// A page of products ordered by id, starting after `cursor`.
    ///
    /// Fetches one extra document to learn whether another page exists. On a
    /// degraded connection only the first page is available and
    /// `has_next_page` is always `false`.
    #[instrument(skip(self))]
    pub async fn list_products_page(
        &self,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Page<Product> {
        if page_size == 0 {
            return Page::empty();
        }
        self.try_products_page(page_size, cursor)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to fetch product page");
                Page::empty()
            })
    }

    async fn try_products_page(
        &self,
        page_size: usize,
        cursor: Option<&str>,
    ) -> StoreResult<Page<Product>> {
        let products = CollectionPath::parse(PRODUCTS)?;

        let (mut documents, has_next_page) = match self.connections.connection().await {
            Connection::Native { store, .. } => {
                let query = Query::new(products, page_size + 1)
                    .order(Order::ById)
                    .start_after(cursor.map(str::to_string));
                let documents = store.run_query(&query).await?;
                let has_next_page = documents.len() > page_size;
                (documents, has_next_page)
            }
            Connection::Degraded(rest) => {
                if cursor.is_some() {
                    tracing::warn!("Cursor ignored in degraded mode, returning first page");
                }
                (rest.list_page(&products, page_size).await?, false)
            }
        };
        documents.truncate(page_size);

        let next_cursor = documents.last().map(|doc| doc.id.clone());
        Ok(Page {
            documents: documents.into_iter().map(normalize_product).collect(),
            has_next_page,
            next_cursor,
        })
    }

    /// Create a document with a generated id and a server `createdAt`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unsupported`] on a degraded connection, or the
    /// store error if the commit fails.
    #[instrument(skip(self, fields), fields(collection = %collection))]
    pub async fn create(&self, collection: &CollectionPath, fields: Fields) -> StoreResult<String> {
        let document = collection.doc(&auto_id())?;
        self.create_at(&document, fields).await?;
        Ok(document.id().to_string())
    }

    /// Create a document at a caller-chosen path with a server `createdAt`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if the document exists,
    /// [`StoreError::Unsupported`] on a degraded connection, or the store
    /// error if the commit fails.
    #[instrument(skip(self, fields), fields(document = %document))]
    pub async fn create_at(&self, document: &DocumentPath, fields: Fields) -> StoreResult<()> {
        let store = self.native("create").await?;
        store
            .commit(vec![Write::Create {
                document: document.clone(),
                fields,
                server_timestamps: vec!["createdAt".to_string()],
            }])
            .await
    }

    /// Create a product from normalized input; stored under source labels.
    ///
    /// # Errors
    ///
    /// See [`DataAccess::create`].
    pub async fn create_product(&self, product: NewProduct) -> StoreResult<String> {
        let products = CollectionPath::parse(PRODUCTS)?;
        self.create(&products, PRODUCT_FIELDS.to_stored(product.into_fields()))
            .await
    }

    /// Create or update only the given fields of a document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unsupported`] on a degraded connection, or the
    /// store error if the commit fails.
    #[instrument(skip(self, fields), fields(document = %document))]
    pub async fn upsert_merge(&self, document: &DocumentPath, fields: Fields) -> StoreResult<()> {
        let store = self.native("upsert").await?;
        store
            .commit(vec![Write::Merge {
                document: document.clone(),
                fields,
                server_timestamps: Vec::new(),
            }])
            .await
    }

    /// Merge-upsert every row concurrently. One result per row, in input
    /// order; rows succeed or fail independently.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn bulk_upsert(&self, rows: Vec<(DocumentPath, Fields)>) -> Vec<StoreResult<()>> {
        let writes = rows
            .into_iter()
            .map(|(document, fields)| async move { self.upsert_merge(&document, fields).await });
        join_all(writes).await
    }

    /// Current analysis prompt and its history, newest first.
    pub async fn prompt(&self) -> (PromptSetting, Vec<PromptHistoryEntry>) {
        let Ok(setting) = DocumentPath::parse(PROMPT_SETTING) else {
            return (PromptSetting::default(), Vec::new());
        };
        let current = PromptSetting::from_document(self.get(&setting).await.as_ref());

        let mut history: Vec<_> = match setting.collection(PROMPT_HISTORY) {
            Ok(collection) => self
                .list(
                    &collection,
                    PROMPT_HISTORY_LIMIT,
                    Order::newest_first("timestamp"),
                )
                .await
                .iter()
                .map(PromptHistoryEntry::from_document)
                .collect(),
            Err(_) => Vec::new(),
        };
        PromptHistoryEntry::sort_newest_first(&mut history);
        (current, history)
    }

    /// One prompt history entry.
    pub async fn prompt_history_entry(&self, id: &str) -> Option<PromptHistoryEntry> {
        let path = DocumentPath::parse(PROMPT_SETTING)
            .and_then(|setting| setting.collection(PROMPT_HISTORY))
            .and_then(|history| history.doc(id))
            .ok()?;
        self.get(&path)
            .await
            .map(|doc| PromptHistoryEntry::from_document(&doc))
    }

    /// Append the current prompt to history, then overwrite it.
    ///
    /// Two separate commits; a failure between them leaves the history entry
    /// without the overwrite.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unsupported`] on a degraded connection, or the
    /// store error from either write.
    #[instrument(skip(self, new_prompt))]
    pub async fn update_prompt(&self, new_prompt: &str) -> StoreResult<()> {
        let store = self.native("prompt update").await?;
        let setting = DocumentPath::parse(PROMPT_SETTING)?;
        let history = setting.collection(PROMPT_HISTORY)?.doc(&auto_id())?;

        let previous = PromptSetting::from_document(store.get(&setting).await?.as_ref());
        store
            .commit(vec![Write::Create {
                document: history,
                fields: Fields::from([("prompt".to_string(), previous.prompt.into())]),
                server_timestamps: vec!["timestamp".to_string()],
            }])
            .await?;

        store
            .commit(vec![Write::Set {
                document: setting,
                fields: Fields::from([("prompt".to_string(), new_prompt.into())]),
                server_timestamps: vec!["updatedAt".to_string()],
            }])
            .await?;
        tracing::info!("Analysis prompt updated");
        Ok(())
    }

    /// Delete one document. Sub-collections are left in place.
    ///
    /// # Errors
    ///
    /// Returns the store error if the delete fails.
    #[instrument(skip(self), fields(document = %document))]
    pub async fn delete(&self, document: &DocumentPath) -> StoreResult<()> {
        match self.connections.connection().await {
            Connection::Native { store, .. } => {
                store
                    .commit(vec![Write::Delete {
                        document: document.clone(),
                    }])
                    .await
            }
            Connection::Degraded(rest) => rest.delete(document).await,
        }
    }

    /// The native store, or `Unsupported` when degraded.
    async fn native(&self, operation: &'static str) -> StoreResult<Arc<dyn NativeStore>> {
        match self.connections.connection().await {
            Connection::Native { store, .. } => Ok(store),
            Connection::Degraded(_) => Err(StoreError::Unsupported(operation)),
        }
    }
}

/// Translate stored labels and build the product view.
fn normalize_product(doc: Document) -> Product {
    let doc = Document::new(doc.id, PRODUCT_FIELDS.to_normalized(doc.fields));
    Product::from_document(&doc)
}
