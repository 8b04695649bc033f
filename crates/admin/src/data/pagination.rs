//! Cursor pages and a back/forward product pager.

use serde::Serialize;
use skincare_admin_core::Product;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::DataAccess;

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub documents: Vec<T>,
    pub has_next_page: bool,
    /// Id of the last returned document; `None` only for an empty page.
    /// Only meaningful to resume from when `has_next_page` is set.
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            documents: Vec::new(),
            has_next_page: false,
            next_cursor: None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PagerError {
    /// The load was cancelled; pager state is unchanged.
    #[error("page load cancelled")]
    Cancelled,
}

/// Stateful product browser with previous/next navigation.
///
/// Keeps a stack of the cursors that produced each visited page (the first
/// page has no cursor). A load only updates the pager if its cancellation
/// token is still live once the fetch returns.
#[derive(Debug)]
pub struct ProductPager {
    page_size: usize,
    cursors: Vec<Option<String>>,
    current: Page<Product>,
}

impl ProductPager {
    #[must_use]
    pub const fn new(page_size: usize) -> Self {
        Self {
            page_size,
            cursors: Vec::new(),
            current: Page::empty(),
        }
    }

    /// The most recently loaded page.
    #[must_use]
    pub const fn current(&self) -> &Page<Product> {
        &self.current
    }

    /// 1-based page number, 0 before the first load.
    #[must_use]
    pub fn page_number(&self) -> usize {
        self.cursors.len()
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.cursors.len() > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.current.has_next_page
    }

    /// Load (or reload) the first page.
    ///
    /// # Errors
    ///
    /// Returns [`PagerError::Cancelled`] if `token` fires before the page is committed.
    pub async fn first(
        &mut self,
        data: &DataAccess,
        token: &CancellationToken,
    ) -> Result<(), PagerError> {
        let page = self.fetch(data, None, token).await?;
        self.cursors = vec![None];
        self.current = page;
        Ok(())
    }

    /// Advance one page. Returns `false` when there is no next page.
    ///
    /// # Errors
    ///
    /// Returns [`PagerError::Cancelled`] if `token` fires before the page is committed.
    pub async fn next(
        &mut self,
        data: &DataAccess,
        token: &CancellationToken,
    ) -> Result<bool, PagerError> {
        let Some(cursor) = self.current.next_cursor.clone().filter(|_| self.has_next()) else {
            return Ok(false);
        };
        let page = self.fetch(data, Some(cursor.clone()), token).await?;
        self.cursors.push(Some(cursor));
        self.current = page;
        Ok(true)
    }

    /// Go back one page. Returns `false` on the first page.
    ///
    /// # Errors
    ///
    /// Returns [`PagerError::Cancelled`] if `token` fires before the page is committed.
    pub async fn previous(
        &mut self,
        data: &DataAccess,
        token: &CancellationToken,
    ) -> Result<bool, PagerError> {
        if !self.has_previous() {
            return Ok(false);
        }
        let cursor = self
            .cursors
            .get(self.cursors.len() - 2)
            .cloned()
            .flatten();
        let page = self.fetch(data, cursor, token).await?;
        self.cursors.pop();
        self.current = page;
        Ok(true)
    }

    async fn fetch(
        &self,
        data: &DataAccess,
        cursor: Option<String>,
        token: &CancellationToken,
    ) -> Result<Page<Product>, PagerError> {
        let page = tokio::select! {
            () = token.cancelled() => return Err(PagerError::Cancelled),
            page = data.list_products_page(self.page_size, cursor.as_deref()) => page,
        };
        if token.is_cancelled() {
            return Err(PagerError::Cancelled);
        }
        Ok(page)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::{ConnectionManager, MemoryConnector, MemoryStore};
    use skincare_admin_core::{FieldValue, Fields};
    use std::sync::Arc;

    fn seeded(count: usize) -> DataAccess {
        let store = Arc::new(MemoryStore::new());
        for i in 0..count {
            let fields = Fields::from([("商品名".to_string(), FieldValue::from(format!("P{i}")))]);
            store.insert(&format!("products/p{i:02}"), fields).unwrap();
        }
        let connector = MemoryConnector::new(store);
        DataAccess::new(Arc::new(ConnectionManager::new(Arc::new(connector))))
    }

    fn ids(pager: &ProductPager) -> Vec<String> {
        pager
            .current()
            .documents
            .iter()
            .map(|p| p.id.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_forward_and_back() {
        let data = seeded(5);
        let token = CancellationToken::new();
        let mut pager = ProductPager::new(2);

        pager.first(&data, &token).await.unwrap();
        assert_eq!(ids(&pager), vec!["p00", "p01"]);
        assert!(!pager.has_previous());

        assert!(pager.next(&data, &token).await.unwrap());
        assert!(pager.next(&data, &token).await.unwrap());
        assert_eq!(ids(&pager), vec!["p04"]);
        assert_eq!(pager.page_number(), 3);
        assert!(!pager.next(&data, &token).await.unwrap());

        assert!(pager.previous(&data, &token).await.unwrap());
        assert_eq!(ids(&pager), vec!["p02", "p03"]);
        assert!(pager.previous(&data, &token).await.unwrap());
        assert_eq!(ids(&pager), vec!["p00", "p01"]);
        assert!(!pager.previous(&data, &token).await.unwrap());
    }

    #[tokio::test]
    async fn test_cancelled_load_leaves_state() {
        let data = seeded(3);
        let token = CancellationToken::new();
        let mut pager = ProductPager::new(2);
        pager.first(&data, &token).await.unwrap();

        let cancelled = CancellationToken::new();
        cancelled.cancel();
        assert_eq!(
            pager.next(&data, &cancelled).await,
            Err(PagerError::Cancelled)
        );
        assert_eq!(ids(&pager), vec!["p00", "p01"]);
        assert_eq!(pager.page_number(), 1);
    }
}
