//! HTTP client for the propdb REST API.
//!
//! [`PropertyApi`] is the seam the executor, favorites store and search
//! controller depend on; [`HttpPropertyApi`] is the `reqwest` implementation.
//! Every response is unwrapped from the `{ data, meta }` envelope, and error
//! envelopes are mapped onto [`ClientError`] variants by status.

use std::time::Duration;

use async_trait::async_trait;
use propdb_core::{
    ClientConfig, ListQuery, Property, PropertyPage, PropertySubmission, PropertyUpdate,
    ValidationErrors,
};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ClientError;
use crate::retry::retry_with_backoff;

/// Remote operations on listings and the caller's favorites.
#[async_trait]
pub trait PropertyApi: Send + Sync {
    async fn list_properties(&self, query: &ListQuery) -> Result<PropertyPage, ClientError>;

    async fn get_property(&self, id: &str) -> Result<Property, ClientError>;

    async fn create_property(
        &self,
        submission: &PropertySubmission,
    ) -> Result<Property, ClientError>;

    async fn update_property(
        &self,
        id: &str,
        update: &PropertyUpdate,
    ) -> Result<Property, ClientError>;

    async fn delete_property(&self, id: &str) -> Result<(), ClientError>;

    async fn list_favorites(&self) -> Result<Vec<String>, ClientError>;

    async fn add_favorite(&self, id: &str) -> Result<(), ClientError>;

    async fn remove_favorite(&self, id: &str) -> Result<(), ClientError>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(default)]
    fields: Option<ValidationErrors>,
}

/// `reqwest`-backed [`PropertyApi`].
///
/// Use [`HttpPropertyApi::from_config`] in binaries or
/// [`HttpPropertyApi::with_base_url`] to point at a mock server in tests.
pub struct HttpPropertyApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl HttpPropertyApi {
    /// Creates a client from loaded [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`ClientError::InvalidBaseUrl`] for a malformed API URL.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Ok(Self::with_base_url(
            &config.api_url,
            config.api_token.as_deref(),
            config.request_timeout_secs,
        )?
        .with_retry(config.max_retries, config.retry_backoff_base_ms))
    }

    /// Creates a client with a custom base URL and no retries.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`ClientError::InvalidBaseUrl`] if `base_url` does not parse
    /// or cannot carry path segments.
    pub fn with_base_url(
        base_url: &str,
        token: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("propdb/0.1")
            .build()?;

        let parsed = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidBaseUrl(format!("'{base_url}': {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(format!(
                "'{base_url}' cannot carry a path"
            )));
        }

        Ok(Self {
            client,
            base_url: parsed,
            token: token.map(ToOwned::to_owned),
            max_retries: 0,
            backoff_base_ms: 0,
        })
    }

    /// Enables bounded retry of transient failures on idempotent requests.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// `<base>/api/v1/<segments...>`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["api", "v1"]).extend(segments);
        }
        url
    }

    /// Sends one request and unwraps the `data` field of the envelope.
    ///
    /// POST is never retried; every other method is idempotent on the server.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<T, ClientError> {
        let retries = if method == Method::POST {
            0
        } else {
            self.max_retries
        };
        retry_with_backoff(retries, self.backoff_base_ms, || {
            self.send_once(method.clone(), url.clone(), body.as_ref())
        })
        .await
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> Result<T, ClientError> {
        let mut builder = self.client.request(method, url.clone());
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Self::map_error(status, &url, &text));
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&text).map_err(|e| ClientError::Deserialize {
                context: url.path().to_owned(),
                source: e,
            })?;
        Ok(envelope.data)
    }

    fn map_error(status: StatusCode, url: &Url, body: &str) -> ClientError {
        let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
        match (status, parsed) {
            (StatusCode::NOT_FOUND, _) => ClientError::NotFound(url.path().to_owned()),
            (StatusCode::UNAUTHORIZED, envelope) => {
                ClientError::Unauthorized(envelope.map_or_else(
                    || "missing or invalid token".to_owned(),
                    |e| e.error.message,
                ))
            }
            (
                _,
                Some(ErrorEnvelope {
                    error:
                        ErrorBody {
                            fields: Some(fields),
                            ..
                        },
                }),
            ) if !fields.is_empty() => ClientError::Validation(fields),
            (_, Some(envelope)) => ClientError::UnexpectedStatus {
                status: status.as_u16(),
                code: envelope.error.code,
                message: envelope.error.message,
            },
            (_, None) => ClientError::UnexpectedStatus {
                status: status.as_u16(),
                code: "unknown".to_owned(),
                message: body.chars().take(200).collect(),
            },
        }
    }
}

fn to_body<T: serde::Serialize>(
    value: &T,
    context: &str,
) -> Result<serde_json::Value, ClientError> {
    serde_json::to_value(value).map_err(|e| ClientError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}

#[async_trait]
impl PropertyApi for HttpPropertyApi {
    async fn list_properties(&self, query: &ListQuery) -> Result<PropertyPage, ClientError> {
        let mut url = self.endpoint(&["properties"]);
        let pairs = query.to_query_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        self.request(Method::GET, url, None).await
    }

    async fn get_property(&self, id: &str) -> Result<Property, ClientError> {
        let url = self.endpoint(&["properties", id]);
        self.request(Method::GET, url, None).await
    }

    async fn create_property(
        &self,
        submission: &PropertySubmission,
    ) -> Result<Property, ClientError> {
        let url = self.endpoint(&["properties"]);
        let body = to_body(submission, "create_property")?;
        self.request(Method::POST, url, Some(body)).await
    }

    async fn update_property(
        &self,
        id: &str,
        update: &PropertyUpdate,
    ) -> Result<Property, ClientError> {
        let url = self.endpoint(&["properties", id]);
        let body = to_body(update, "update_property")?;
        self.request(Method::PATCH, url, Some(body)).await
    }

    async fn delete_property(&self, id: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&["properties", id]);
        let _: serde_json::Value = self.request(Method::DELETE, url, None).await?;
        Ok(())
    }

    async fn list_favorites(&self) -> Result<Vec<String>, ClientError> {
        let url = self.endpoint(&["favorites"]);
        self.request(Method::GET, url, None).await
    }

    async fn add_favorite(&self, id: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&["favorites", id]);
        let _: serde_json::Value = self.request(Method::PUT, url, None).await?;
        Ok(())
    }

    async fn remove_favorite(&self, id: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&["favorites", id]);
        let _: serde_json::Value = self.request(Method::DELETE, url, None).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
