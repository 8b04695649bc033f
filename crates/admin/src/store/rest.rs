//! Degraded REST client: page listing, document GET and DELETE.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use skincare_admin_core::Document;
use tracing::instrument;

use super::http::{StoreEndpoint, error_from_response, json_body};
use super::value::WireDocument;
use super::{CollectionPath, DocumentPath, RestStore, StoreError, StoreResult};
use crate::config::StoreConfig;

/// REST fallback client.
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<RestClientInner>,
}

struct RestClientInner {
    client: reqwest::Client,
    endpoint: StoreEndpoint,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    documents: Vec<WireDocument>,
}

impl RestClient {
    /// Create a new REST client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("skincare-admin/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(RestClientInner {
                client,
                endpoint: StoreEndpoint::from_config(config),
            }),
        })
    }
}

#[async_trait]
impl RestStore for RestClient {
    #[instrument(skip(self), fields(collection = %collection))]
    async fn list_page(
        &self,
        collection: &CollectionPath,
        page_size: usize,
    ) -> StoreResult<Vec<Document>> {
        let mut url = self
            .inner
            .endpoint
            .documents_url(Some(collection.as_str()), None)?;
        url.query_pairs_mut()
            .append_pair("pageSize", &page_size.to_string());

        let request = self.inner.client.get(url);
        let response = self.inner.endpoint.authorize(request).send().await?;
        let list: ListResponse = json_body(response).await?;

        // The store may return more than asked for; the caller's limit wins.
        list.documents
            .into_iter()
            .take(page_size)
            .map(WireDocument::into_document)
            .collect()
    }

    #[instrument(skip(self), fields(document = %document))]
    async fn get(&self, document: &DocumentPath) -> StoreResult<Option<Document>> {
        let url = self
            .inner
            .endpoint
            .documents_url(Some(document.as_str()), None)?;
        let request = self.inner.client.get(url);
        let response = self.inner.endpoint.authorize(request).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let wire: WireDocument = json_body(response).await?;
        wire.into_document().map(Some)
    }

    #[instrument(skip(self), fields(document = %document))]
    async fn delete(&self, document: &DocumentPath) -> StoreResult<()> {
        let url = self
            .inner
            .endpoint
            .documents_url(Some(document.as_str()), None)?;
        let request = self.inner.client.delete(url);
        let response = self.inner.endpoint.authorize(request).send().await?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(error_from_response(response).await)
    }

    async fn probe(&self) -> StoreResult<()> {
        let users = CollectionPath::parse("users")?;
        self.list_page(&users, 1).await.map(|_| ())
    }
}
