use crate::records;
use crate::rest::RestApi;
use crate::rest::client::RestClient;
use crate::rest::types::{MatchPolicy, Query, Record};
use async_trait::async_trait;
use hypercore_common::prelude::Result;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::Duration;
use tokio::sync::Mutex;

/// [`RestClient`] decorator memoizing full-table list responses per endpoint.
///
/// The first `list_records` call on an endpoint fetches the whole table,
/// ignoring its query, and stores it. Every later call on that endpoint is
/// served from memory and filtered client-side. Entries are never evicted:
/// create one client per logical operation.
///
pub struct CachedRestClient {
    inner: RestClient,
    cache: Mutex<HashMap<String, Vec<Record>>>,
}

impl CachedRestClient {
    pub fn new(inner: RestClient) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The wrapped uncached client.
    ///
    pub fn inner(&self) -> &RestClient {
        &self.inner
    }

    /// Drops every cached table.
    ///
    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
        tracing::debug!(target: "cache", "Cache cleared");
    }

    /// Endpoints currently held in the cache, sorted.
    ///
    pub async fn cached_endpoints(&self) -> Vec<String> {
        let mut endpoints: Vec<String> = self.cache.lock().await.keys().cloned().collect();
        endpoints.sort();
        endpoints
    }
}

impl From<RestClient> for CachedRestClient {
    fn from(inner: RestClient) -> Self {
        Self::new(inner)
    }
}

#[async_trait]
impl RestApi for CachedRestClient {
    fn match_policy(&self) -> MatchPolicy {
        self.inner.match_policy()
    }

    async fn fetch_records(
        &self,
        endpoint: &str,
        timeout: Option<Duration>,
    ) -> Result<Vec<Record>> {
        self.inner.fetch_records(endpoint, timeout).await
    }

    async fn list_records(
        &self,
        endpoint: &str,
        query: Option<&Query>,
        timeout: Option<Duration>,
    ) -> Result<Vec<Record>> {
        let mut cache = self.cache.lock().await;
        let records = match cache.entry(endpoint.to_owned()) {
            Entry::Occupied(entry) => {
                tracing::trace!(target: "cache", endpoint, "Cache hit");
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                let records = self.inner.fetch_records(endpoint, timeout).await?;
                tracing::debug!(target: "cache", endpoint, count = records.len(), "Table cached");
                entry.insert(records)
            }
        };

        Ok(records::filter_results(records.as_slice(), query))
    }

    async fn create_record(
        &self,
        endpoint: &str,
        payload: &Value,
        check_mode: bool,
        timeout: Option<Duration>,
    ) -> Result<Record> {
        self.inner
            .create_record(endpoint, payload, check_mode, timeout)
            .await
    }

    async fn update_record(
        &self,
        endpoint: &str,
        payload: &Value,
        check_mode: bool,
        timeout: Option<Duration>,
    ) -> Result<Record> {
        self.inner
            .update_record(endpoint, payload, check_mode, timeout)
            .await
    }

    async fn put_record(
        &self,
        endpoint: &str,
        payload: Option<&Value>,
        check_mode: bool,
        timeout: Option<Duration>,
        binary_data: Option<Vec<u8>>,
        headers: Option<HeaderMap>,
    ) -> Result<Option<Record>> {
        self.inner
            .put_record(endpoint, payload, check_mode, timeout, binary_data, headers)
            .await
    }

    async fn delete_record(
        &self,
        endpoint: &str,
        check_mode: bool,
        timeout: Option<Duration>,
    ) -> Result<Option<Record>> {
        self.inner.delete_record(endpoint, check_mode, timeout).await
    }
}
