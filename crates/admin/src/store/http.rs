//! URL building, credentials and error decoding shared by the HTTP clients.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use super::{StoreError, StoreResult};
use crate::config::StoreConfig;

/// Where the store lives and how requests authenticate.
///
/// Implements `Debug` manually to redact credentials.
#[derive(Clone)]
pub struct StoreEndpoint {
    base_url: Url,
    project_id: String,
    api_key: Option<SecretString>,
    access_token: Option<SecretString>,
}

impl std::fmt::Debug for StoreEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreEndpoint")
            .field("base_url", &self.base_url.as_str())
            .field("project_id", &self.project_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl StoreEndpoint {
    #[must_use]
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
            access_token: config.access_token.clone(),
        }
    }

    /// `projects/{project}/databases/(default)`
    #[must_use]
    pub fn database_name(&self) -> String {
        format!("projects/{}/databases/(default)", self.project_id)
    }

    /// Full resource name of a document or collection path.
    #[must_use]
    pub fn resource_name(&self, path: &str) -> String {
        format!("{}/documents/{path}", self.database_name())
    }

    /// URL under `.../documents`, optionally followed by a path and a
    /// `:verb` suffix on the last segment. The API key, when configured, is
    /// appended as the `key` query parameter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] if the base URL cannot carry a path.
    pub fn documents_url(&self, path: Option<&str>, verb: Option<&str>) -> StoreResult<Url> {
        let mut segments: Vec<String> = [
            "v1",
            "projects",
            self.project_id.as_str(),
            "databases",
            "(default)",
            "documents",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        if let Some(path) = path {
            segments.extend(path.split('/').map(str::to_string));
        }
        if let (Some(verb), Some(last)) = (verb, segments.last_mut()) {
            last.push(':');
            last.push_str(verb);
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::InvalidPath(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(&segments);
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("key", key.expose_secret());
        }
        Ok(url)
    }

    /// Attach the bearer token, if configured.
    #[must_use]
    pub fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Decode a non-success response into a [`StoreError`].
pub(crate) async fn error_from_response(response: reqwest::Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    let (message, code) = serde_json::from_str::<ErrorEnvelope>(&body).map_or_else(
        |_| (body.clone(), String::new()),
        |envelope| (envelope.error.message, envelope.error.status),
    );

    match (status, code.as_str()) {
        (404, _) | (_, "NOT_FOUND") => StoreError::NotFound(message),
        (_, "ALREADY_EXISTS") => StoreError::AlreadyExists(message),
        _ => StoreError::Api { status, message },
    }
}

/// Parse a successful JSON response body.
pub(crate) async fn json_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> StoreResult<T> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    response
        .json()
        .await
        .map_err(|e| StoreError::Parse(format!("Failed to parse response: {e}")))
}
