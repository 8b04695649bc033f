//! Native store client speaking the structured-query and commit endpoints.
//!
//! One client is built per [`ConnectionStrategy`]; the strategy only changes
//! the HTTP transport underneath:
//!
//! | strategy | transport |
//! |---|---|
//! | `Default` | HTTP/2 with prior knowledge (single multiplexed stream) |
//! | `ForceLongPolling` | HTTP/1.1 only, no idle connection reuse |
//! | `AutoDetectLongPolling` | whatever ALPN negotiates |

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use skincare_admin_core::Document;
use tracing::instrument;

use super::connection::ConnectionStrategy;
use super::http::{StoreEndpoint, error_from_response, json_body};
use super::value::{WireDocument, encode_fields, quote_field_path};
use super::{
    CollectionPath, Direction, DocumentPath, NativeStore, Order, Query, StoreError, StoreResult,
    Write,
};
use crate::config::StoreConfig;

/// Native store client.
#[derive(Clone)]
pub struct FirestoreClient {
    inner: Arc<FirestoreClientInner>,
}

struct FirestoreClientInner {
    client: reqwest::Client,
    endpoint: StoreEndpoint,
    strategy: ConnectionStrategy,
}

/// One element of a `runQuery` response stream.
#[derive(Debug, Deserialize)]
struct RunQueryItem {
    document: Option<WireDocument>,
}

impl FirestoreClient {
    /// Create a client whose transport follows `strategy`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StoreConfig, strategy: ConnectionStrategy) -> Result<Self, StoreError> {
        let builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("skincare-admin/", env!("CARGO_PKG_VERSION")));

        let builder = match strategy {
            ConnectionStrategy::Default => builder.http2_prior_knowledge(),
            ConnectionStrategy::ForceLongPolling => builder.http1_only().pool_max_idle_per_host(0),
            ConnectionStrategy::AutoDetectLongPolling => builder,
        };

        Ok(Self {
            inner: Arc::new(FirestoreClientInner {
                client: builder.build()?,
                endpoint: StoreEndpoint::from_config(config),
                strategy,
            }),
        })
    }

    /// Verify the store answers a minimal query.
    ///
    /// # Errors
    ///
    /// Returns the underlying store error if the query fails.
    #[instrument(skip(self), fields(strategy = ?self.inner.strategy))]
    pub async fn probe(&self) -> StoreResult<()> {
        let users = CollectionPath::parse("users")?;
        self.run_query(&Query::new(users, 1)).await.map(|_| ())
    }

    /// Build the `structuredQuery` body.
    fn structured_query(&self, query: &Query) -> Value {
        let mut structured = json!({
            "from": [{ "collectionId": query.collection.collection_id() }],
            "limit": query.limit,
        });

        let order_by = match &query.order {
            Order::Unordered => None,
            Order::ById => Some(json!([{
                "field": { "fieldPath": "__name__" },
                "direction": "ASCENDING",
            }])),
            Order::Field { path, direction } => Some(json!([{
                "field": { "fieldPath": quote_field_path(path) },
                "direction": match direction {
                    Direction::Ascending => "ASCENDING",
                    Direction::Descending => "DESCENDING",
                },
            }])),
        };
        if let Some(order_by) = order_by {
            structured["orderBy"] = order_by;
        }

        if let Some(cursor) = &query.start_after {
            let reference = self
                .inner
                .endpoint
                .resource_name(&format!("{}/{cursor}", query.collection));
            structured["startAt"] = json!({
                "values": [{ "referenceValue": reference }],
                "before": false,
            });
        }

        json!({ "structuredQuery": structured })
    }

    fn encode_write(&self, write: &Write) -> Value {
        let name = self.inner.endpoint.resource_name(write.document().as_str());
        let transforms = |fields: &[String]| -> Vec<Value> {
            fields
                .iter()
                .map(|field| {
                    json!({
                        "fieldPath": quote_field_path(field),
                        "setToServerValue": "REQUEST_TIME",
                    })
                })
                .collect()
        };

        match write {
            Write::Create {
                fields,
                server_timestamps,
                ..
            } => json!({
                "update": { "name": name, "fields": encode_fields(fields) },
                "updateTransforms": transforms(server_timestamps.as_slice()),
                "currentDocument": { "exists": false },
            }),
            Write::Merge {
                fields,
                server_timestamps,
                ..
            } => json!({
                "update": { "name": name, "fields": encode_fields(fields) },
                "updateMask": {
                    "fieldPaths": fields.keys().map(|k| quote_field_path(k)).collect::<Vec<_>>(),
                },
                "updateTransforms": transforms(server_timestamps.as_slice()),
            }),
            Write::Set {
                fields,
                server_timestamps,
                ..
            } => json!({
                "update": { "name": name, "fields": encode_fields(fields) },
                "updateTransforms": transforms(server_timestamps.as_slice()),
            }),
            Write::Delete { .. } => json!({ "delete": name }),
        }
    }
}

#[async_trait]
impl NativeStore for FirestoreClient {
    fn backend(&self) -> &'static str {
        "native"
    }

    #[instrument(skip(self, query), fields(collection = %query.collection, limit = query.limit))]
    async fn run_query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let url = self
            .inner
            .endpoint
            .documents_url(query.collection.parent(), Some("runQuery"))?;
        let request = self
            .inner
            .client
            .post(url)
            .json(&self.structured_query(query));
        let response = self.inner.endpoint.authorize(request).send().await?;

        let items: Vec<RunQueryItem> = json_body(response).await?;
        items
            .into_iter()
            .filter_map(|item| item.document)
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

    #[instrument(skip(self, writes), fields(writes = writes.len()))]
    async fn commit(&self, writes: Vec<Write>) -> StoreResult<()> {
        let url = self.inner.endpoint.documents_url(None, Some("commit"))?;
        let body = json!({
            "writes": writes.iter().map(|w| self.encode_write(w)).collect::<Vec<_>>(),
        });
        let request = self.inner.client.post(url).json(&body);
        let response = self.inner.endpoint.authorize(request).send().await?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(error_from_response(response).await)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use skincare_admin_core::{FieldValue, Fields};
    use std::time::Duration;
    use url::Url;

    fn client() -> FirestoreClient {
        let config = StoreConfig {
            project_id: "demo".to_string(),
            base_url: Url::parse("http://localhost:8080").unwrap(),
            api_key: None,
            access_token: None,
            timeout: Duration::from_secs(5),
        };
        FirestoreClient::new(&config, ConnectionStrategy::AutoDetectLongPolling).unwrap()
    }

    #[test]
    fn test_structured_query_with_cursor() {
        let products = CollectionPath::parse("products").unwrap();
        let query = Query::new(products, 21)
            .order(Order::ById)
            .start_after(Some("abc".to_string()));

        let body = client().structured_query(&query);
        let structured = &body["structuredQuery"];
        assert_eq!(structured["from"][0]["collectionId"], "products");
        assert_eq!(structured["limit"], 21);
        assert_eq!(structured["orderBy"][0]["field"]["fieldPath"], "__name__");
        assert_eq!(
            structured["startAt"]["values"][0]["referenceValue"],
            "projects/demo/databases/(default)/documents/products/abc"
        );
        assert_eq!(structured["startAt"]["before"], false);
    }

    #[test]
    fn test_structured_query_field_order() {
        let users = CollectionPath::parse("users").unwrap();
        let body = client().structured_query(&Query::new(users, 20).order(Order::newest_first("createdAt")));
        let order = &body["structuredQuery"]["orderBy"][0];
        assert_eq!(order["field"]["fieldPath"], "createdAt");
        assert_eq!(order["direction"], "DESCENDING");
        assert!(body["structuredQuery"].get("startAt").is_none());
    }

    #[test]
    fn test_encode_merge_write() {
        let document = DocumentPath::parse("products/p1").unwrap();
        let fields = Fields::from([("商品名".to_string(), FieldValue::from("Toner"))]);
        let write = Write::Merge {
            document,
            fields,
            server_timestamps: vec!["updatedAt".to_string()],
        };

        let encoded = client().encode_write(&write);
        assert_eq!(
            encoded["update"]["name"],
            "projects/demo/databases/(default)/documents/products/p1"
        );
        assert_eq!(encoded["updateMask"]["fieldPaths"][0], "`商品名`");
        assert_eq!(encoded["updateTransforms"][0]["fieldPath"], "updatedAt");
        assert!(encoded.get("currentDocument").is_none());
    }

    #[test]
    fn test_encode_create_and_delete() {
        let document = DocumentPath::parse("users/u1").unwrap();
        let create = client().encode_write(&Write::Create {
            document: document.clone(),
            fields: Fields::new(),
            server_timestamps: vec![],
        });
        assert_eq!(create["currentDocument"]["exists"], false);

        let delete = client().encode_write(&Write::Delete { document });
        assert_eq!(
            delete["delete"],
            "projects/demo/databases/(default)/documents/users/u1"
        );
    }
}
