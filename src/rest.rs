pub mod cached;
pub mod client;
pub mod transport;
pub mod types;

// -----------------------------------------------------------------------------

use crate::records;
use crate::rest::types::{MatchPolicy, Query, Record};
use async_trait::async_trait;
use hypercore_common::prelude::{Error, Result};
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::time::Duration;

/// Endpoint-level CRUD over the platform REST API.
///
/// Resource modules depend on this trait only, so a plain [`client::RestClient`]
/// and a [`cached::CachedRestClient`] are interchangeable apart from the
/// number of HTTP calls they make.
///
/// Every mutating method takes `check_mode`; when it is `true` no request is
/// sent and the platform is left untouched.
///
#[async_trait]
pub trait RestApi: Send + Sync {
    /// Policy applied by [`RestApi::get_record`] to several matches.
    fn match_policy(&self) -> MatchPolicy;

    /// Fetches the full `result` list of `endpoint`, always over the network.
    async fn fetch_records(&self, endpoint: &str, timeout: Option<Duration>)
    -> Result<Vec<Record>>;

    /// Lists the records of `endpoint` matching `query`.
    ///
    /// The query is never sent to the platform: the full table is fetched and
    /// filtered client-side.
    ///
    async fn list_records(
        &self,
        endpoint: &str,
        query: Option<&Query>,
        timeout: Option<Duration>,
    ) -> Result<Vec<Record>> {
        let records = self.fetch_records(endpoint, timeout).await?;
        Ok(records::filter_results(&records, query))
    }

    /// Returns the single record of `endpoint` matching `query`.
    ///
    /// # Returns
    ///
    /// * `None` when nothing matches and `must_exist` is `false`.
    /// * The first match when several match and the policy is
    ///   [`MatchPolicy::First`].
    ///
    /// # Errors
    ///
    /// * `Error::NotFound` when nothing matches and `must_exist` is `true`.
    /// * `Error::Ambiguous` when several match and the policy is
    ///   [`MatchPolicy::Fail`].
    ///
    async fn get_record(
        &self,
        endpoint: &str,
        query: Option<&Query>,
        must_exist: bool,
    ) -> Result<Option<Record>> {
        let matches = self.list_records(endpoint, query, None).await?;
        let count = matches.len();

        match (matches.into_iter().next(), count, self.match_policy()) {
            (None, _, _) if must_exist => Err(Error::NotFound(format!(
                "no record at {} matches {}",
                endpoint,
                records::describe_query(query)
            ))),
            (None, _, _) => Ok(None),
            (Some(record), 1, _) | (Some(record), _, MatchPolicy::First) => Ok(Some(record)),
            (Some(_), count, MatchPolicy::Fail) => Err(Error::Ambiguous(format!(
                "{} records at {} match {}",
                count,
                endpoint,
                records::describe_query(query)
            ))),
        }
    }

    /// POSTs `payload` and returns the platform's task descriptor.
    async fn create_record(
        &self,
        endpoint: &str,
        payload: &Value,
        check_mode: bool,
        timeout: Option<Duration>,
    ) -> Result<Record>;

    /// PATCHes `payload` and returns the platform's task descriptor.
    async fn update_record(
        &self,
        endpoint: &str,
        payload: &Value,
        check_mode: bool,
        timeout: Option<Duration>,
    ) -> Result<Record>;

    /// PUTs a JSON payload or raw `binary_data`.
    ///
    /// Returns `None` in check mode and when the platform answers with an
    /// empty body.
    ///
    async fn put_record(
        &self,
        endpoint: &str,
        payload: Option<&Value>,
        check_mode: bool,
        timeout: Option<Duration>,
        binary_data: Option<Vec<u8>>,
        headers: Option<HeaderMap>,
    ) -> Result<Option<Record>>;

    /// DELETEs `endpoint` and returns the platform's task descriptor.
    ///
    /// Returns `None` in check mode and when the platform answers with an
    /// empty body.
    ///
    async fn delete_record(
        &self,
        endpoint: &str,
        check_mode: bool,
        timeout: Option<Duration>,
    ) -> Result<Option<Record>>;
}
