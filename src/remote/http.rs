//! reqwest-backed [`RemoteCollection`].

use super::{ErrorBody, RemoteCollection, RemoteError, RemoteResult};
use crate::store::Record;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use tracing::{debug, instrument};

/// HTTP client bound to one collection endpoint, e.g.
/// `https://host/ExpenseTracker`.
#[derive(Debug)]
pub struct HttpCollection<T> {
    client: Client,
    base_url: String,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for HttpCollection<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: Record> HttpCollection<T> {
    /// Builds a client for the collection at `base_url`.
    pub fn new(base_url: &str) -> RemoteResult<Self> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuses an existing connection pool.
    #[must_use]
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            _record: PhantomData,
        }
    }

    /// Collection URL without trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn item_url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url, id)
    }

    async fn ensure_success(response: reqwest::Response) -> RemoteResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await?;
        Err(RemoteError::Status {
            status: status.as_u16(),
            body: ErrorBody::from_text(text),
        })
    }

    async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> RemoteResult<R> {
        let response = Self::ensure_success(response).await?;
        response.json().await.map_err(Into::into)
    }
}

#[async_trait]
impl<T: Record> RemoteCollection<T> for HttpCollection<T> {
    #[instrument(skip(self), fields(url = %self.base_url))]
    async fn list(&self) -> RemoteResult<Vec<T>> {
        let response = self.client.get(&self.base_url).send().await?;
        let records: Vec<T> = Self::decode(response).await?;
        debug!("Listed {} records", records.len());
        Ok(records)
    }

    #[instrument(skip(self, record), fields(url = %self.base_url))]
    async fn create(&self, record: &T) -> RemoteResult<T> {
        let response = self.client.post(&self.base_url).json(record).send().await?;
        Self::decode(response).await
    }

    #[instrument(skip(self, patch), fields(url = %self.base_url))]
    async fn replace(&self, id: &str, patch: &T::Patch) -> RemoteResult<T> {
        let response = self.client.put(self.item_url(id)).json(patch).send().await?;
        Self::decode(response).await
    }

    #[instrument(skip(self), fields(url = %self.base_url))]
    async fn delete(&self, id: &str) -> RemoteResult<()> {
        let response = self.client.delete(self.item_url(id)).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}
