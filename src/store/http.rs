//! Hosted record store backend.
//!
//! Speaks the store's REST surface: `/v1/data/{collection}` for list/create
//! and `/v1/data/{collection}/{id}` for update/delete. Equality filters are
//! sent as repeated `where[field]=value` query pairs. The bearer token comes
//! from config and never leaves the `SecretString` except at header build
//! time.

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use crate::config::StoreConfig;
use crate::error::StoreError;

use super::{ListQuery, RecordStore};

const USER_AGENT: &str = concat!("pipeboard/", env!("CARGO_PKG_VERSION"));

pub struct HttpStore {
    client: Client,
    endpoint: Url,
    api_token: Option<SecretString>,
}

#[derive(Deserialize)]
struct RecordsEnvelope {
    records: Vec<Value>,
}

#[derive(Deserialize)]
struct RecordEnvelope {
    record: Value,
}

impl HttpStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_token: config.api_token.clone(),
        })
    }

    fn collection_url(&self, collection: &str, id: Option<&str>) -> Result<Url, StoreError> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StoreError::Unavailable("endpoint cannot be a base URL".into()))?;
            segments.pop_if_empty().push("v1").push("data").push(collection);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Map an HTTP failure status onto the store taxonomy.
    async fn fail(
        collection: &str,
        id: Option<&str>,
        response: reqwest::Response,
    ) -> StoreError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Auth(format!(
                "store rejected credentials ({status})"
            )),
            StatusCode::NOT_FOUND => StoreError::not_found(collection, id.unwrap_or("?")),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                StoreError::Serialization(format!("{status}: {body}"))
            }
            _ => StoreError::Unavailable(format!("{status}: {body}")),
        }
    }

    fn transport(e: reqwest::Error) -> StoreError {
        StoreError::Unavailable(e.to_string())
    }
}

#[async_trait::async_trait]
impl RecordStore for HttpStore {
    async fn list(&self, collection: &str, query: &ListQuery) -> Result<Vec<Value>, StoreError> {
        let mut url = self.collection_url(collection, None)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (field, value) in &query.filters {
                pairs.append_pair(&format!("where[{field}]"), value);
            }
            if let Some((field, order)) = &query.order {
                pairs.append_pair("order_by", field);
                pairs.append_pair("order", order.as_str());
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }

        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(Self::transport)?;
        if !response.status().is_success() {
            return Err(Self::fail(collection, None, response).await);
        }
        let envelope: RecordsEnvelope = response.json().await.map_err(Self::transport)?;
        Ok(envelope.records)
    }

    async fn create(&self, collection: &str, document: Value) -> Result<Value, StoreError> {
        let url = self.collection_url(collection, None)?;
        let response = self
            .request(Method::POST, url)
            .json(&json!({ "record": document }))
            .send()
            .await
            .map_err(Self::transport)?;
        if !response.status().is_success() {
            return Err(Self::fail(collection, None, response).await);
        }
        let envelope: RecordEnvelope = response.json().await.map_err(Self::transport)?;
        Ok(envelope.record)
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError> {
        let url = self.collection_url(collection, Some(id))?;
        let response = self
            .request(Method::PATCH, url)
            .json(&json!({ "patch": patch }))
            .send()
            .await
            .map_err(Self::transport)?;
        if !response.status().is_success() {
            return Err(Self::fail(collection, Some(id), response).await);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let url = self.collection_url(collection, Some(id))?;
        let response = self
            .request(Method::DELETE, url)
            .send()
            .await
            .map_err(Self::transport)?;
        if !response.status().is_success() {
            return Err(Self::fail(collection, Some(id), response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_for(endpoint: &str) -> HttpStore {
        HttpStore::new(&StoreConfig {
            endpoint: Url::parse(endpoint).expect("url"),
            api_token: None,
            offline: false,
        })
        .expect("store")
    }

    #[test]
    fn collection_url_joins_segments() {
        let store = store_for("https://api.example.com");
        let url = store.collection_url("leads", None).expect("url");
        assert_eq!(url.as_str(), "https://api.example.com/v1/data/leads");

        let url = store.collection_url("deals", Some("d-1")).expect("url");
        assert_eq!(url.as_str(), "https://api.example.com/v1/data/deals/d-1");
    }

    #[test]
    fn collection_url_respects_endpoint_prefix() {
        let store = store_for("https://example.com/hosted/");
        let url = store.collection_url("clients", None).expect("url");
        assert_eq!(url.as_str(), "https://example.com/hosted/v1/data/clients");
    }
}
