//! Repository backed by the hosted relational service's REST interface.
//!
//! Rows live in a single table addressed as `/rest/v1/{table}`. Filters use
//! the `column=eq.value` query convention and writes ask for the affected
//! rows back with `Prefer: return=representation`.

use async_trait::async_trait;
use board_core::{BoardElement, BoardError, BoardId, BoardResult, ElementId, ElementPatch, NewElement};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::StoreConfig;
use crate::repository::{Repository, RepositoryError};

const RETURN_REPRESENTATION: &str = "return=representation";

/// REST client for the elements table.
#[derive(Debug, Clone)]
pub struct RestRepository {
    http: Client,
    endpoint: Url,
    api_key: String,
}

impl RestRepository {
    /// Build a client for the configured service.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NotConfigured`] if the URL is malformed or the
    /// HTTP client cannot be built.
    pub fn new(config: &StoreConfig) -> BoardResult<Self> {
        let mut endpoint = Url::parse(&config.api_url)
            .map_err(|e| BoardError::NotConfigured(format!("invalid API URL: {e}")))?;
        let path = format!(
            "{}/rest/v1/{}",
            endpoint.path().trim_end_matches('/'),
            config.elements_table
        );
        endpoint.set_path(&path);

        let http = Client::builder()
            .user_agent(concat!("vision-board/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BoardError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint,
            api_key: config.api_key.clone(),
        })
    }

    /// The table endpoint requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn url(&self, filters: &[(&str, String)]) -> Url {
        let mut url = self.endpoint.clone();
        if !filters.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in filters {
                query.append_pair(key, value);
            }
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn by_id(&self, method: Method, id: ElementId) -> RequestBuilder {
        self.request(method, self.url(&[("id", format!("eq.{id}"))]))
            .header("Prefer", RETURN_REPRESENTATION)
    }

    async fn rows<T: DeserializeOwned>(response: Response) -> Result<Vec<T>, RepositoryError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RepositoryError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Prefer the service's `message` field, then the raw body, then the reason.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
    }
    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

#[async_trait]
impl Repository for RestRepository {
    async fn list_elements(&self, board: &BoardId) -> Result<Vec<BoardElement>, RepositoryError> {
        let url = self.url(&[
            ("board_id", format!("eq.{board}")),
            ("order", "created_at.asc".to_string()),
        ]);
        debug!(board = %board, "GET elements");
        let response = self.request(Method::GET, url).send().await?;
        Self::rows(response).await
    }

    async fn create_element(&self, element: &NewElement) -> Result<BoardElement, RepositoryError> {
        debug!(board = %element.board_id, kind = element.kind.type_name(), "POST element");
        let response = self
            .request(Method::POST, self.url(&[]))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(element)
            .send()
            .await?;
        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::Decode("insert returned no rows".to_string()))
    }

    async fn update_element(
        &self,
        id: ElementId,
        patch: &ElementPatch,
    ) -> Result<BoardElement, RepositoryError> {
        debug!(element = %id, "PATCH element");
        let response = self.by_id(Method::PATCH, id).json(patch).send().await?;
        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn delete_element(&self, id: ElementId) -> Result<(), RepositoryError> {
        debug!(element = %id, "DELETE element");
        let response = self.by_id(Method::DELETE, id).send().await?;
        let deleted: Vec<Value> = Self::rows(response).await?;
        if deleted.is_empty() {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }
}
