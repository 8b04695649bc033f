//! Raw collection and document browser.

use skincare_admin_core::Document;

use crate::data::{DataAccess, PRODUCTS, SKIN_ANALYSIS, USERS};
use crate::store::{CollectionPath, DocumentPath, Order, StoreResult};

/// Documents shown per browsed collection.
pub const BROWSE_LIMIT: usize = 50;

/// Root collections offered in the browser. Root collections cannot be
/// enumerated through the document API, so the list is fixed.
#[must_use]
pub const fn known_collections() -> [&'static str; 5] {
    [USERS, PRODUCTS, SKIN_ANALYSIS, "debug", "test"]
}

/// First [`BROWSE_LIMIT`] documents of any collection path.
///
/// # Errors
///
/// Returns [`crate::store::StoreError::InvalidPath`] for a malformed path.
pub async fn browse_collection(data: &DataAccess, path: &str) -> StoreResult<Vec<Document>> {
    let collection = CollectionPath::parse(path)?;
    Ok(data.list(&collection, BROWSE_LIMIT, Order::Unordered).await)
}

/// One document by collection path and id.
///
/// # Errors
///
/// Returns [`crate::store::StoreError::InvalidPath`] for a malformed path.
pub async fn browse_document(
    data: &DataAccess,
    collection: &str,
    id: &str,
) -> StoreResult<Option<Document>> {
    let document: DocumentPath = CollectionPath::parse(collection)?.doc(id)?;
    Ok(data.get(&document).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::{ConnectionManager, MemoryConnector, MemoryStore};
    use skincare_admin_core::Fields;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_browse_caps_at_limit() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..(BROWSE_LIMIT + 5) {
            store.insert(&format!("debug/d{i:03}"), Fields::new()).unwrap();
        }
        let connector = MemoryConnector::new(store);
        let data = DataAccess::new(Arc::new(ConnectionManager::new(Arc::new(connector))));

        assert_eq!(
            browse_collection(&data, "debug").await.unwrap().len(),
            BROWSE_LIMIT
        );
        assert!(browse_document(&data, "debug", "d000").await.unwrap().is_some());
        assert!(browse_document(&data, "debug", "nope").await.unwrap().is_none());
        assert!(browse_collection(&data, "debug/d000").await.is_err());
    }
}
