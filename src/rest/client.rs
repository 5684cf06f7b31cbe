use crate::config::PlatformConfig;
use crate::rest::RestApi;
use crate::rest::transport::{Request, Transport};
use crate::rest::types::{Envelope, MatchPolicy, Record, check_mode_placeholder};
use async_trait::async_trait;
use hypercore_common::prelude::{Error, RestOperation, Result};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Uncached implementation of [`RestApi`] on top of a [`Transport`].
///
pub struct RestClient {
    transport: Transport,
    match_policy: MatchPolicy,
}

impl RestClient {
    /// Creates a client failing on ambiguous `get_record` matches.
    ///
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            match_policy: MatchPolicy::default(),
        }
    }

    /// Builds the transport and the client from the `platform` config section.
    ///
    pub fn from_config(config: &PlatformConfig) -> Result<Self> {
        let mut transport = Transport::new(config.host.clone(), config.auth()?)
            .with_validate_certs(config.validate_certs);
        if let Some(timeout) = config.timeout() {
            transport = transport.with_timeout(timeout);
        }

        Ok(Self::new(transport).with_match_policy(config.match_policy))
    }

    pub fn with_match_policy(mut self, match_policy: MatchPolicy) -> Self {
        self.match_policy = match_policy;
        self
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Sends a mutating JSON request and unwraps the task descriptor.
    ///
    async fn mutate(
        &self,
        method: Method,
        operation: RestOperation,
        endpoint: &str,
        payload: &Value,
        timeout: Option<Duration>,
        accepted: &[StatusCode],
    ) -> Result<Record> {
        let response = self
            .transport
            .request(Request::new(method, endpoint).json(payload).timeout(timeout))
            .await?
            .ensure_status(operation, accepted)?;

        let record = unwrap_result(response.json::<Value>()?, operation, response.status)?;
        tracing::debug!(target: "rest", %operation, endpoint, ?record, "Record mutated");
        Ok(record)
    }
}

/// Takes the `result` member of a mutation answer, or the whole body when the
/// platform did not wrap it.
///
fn unwrap_result(body: Value, operation: RestOperation, status: StatusCode) -> Result<Record> {
    match body {
        Value::Object(mut object) => match object.remove("result") {
            Some(Value::Object(result)) => Ok(result),
            Some(other) => Err(Error::UnexpectedResponse(operation, status, other.to_string())),
            None => Ok(object),
        },
        other => Err(Error::UnexpectedResponse(operation, status, other.to_string())),
    }
}

#[async_trait]
impl RestApi for RestClient {
    fn match_policy(&self) -> MatchPolicy {
        self.match_policy
    }

    async fn fetch_records(
        &self,
        endpoint: &str,
        timeout: Option<Duration>,
    ) -> Result<Vec<Record>> {
        let response = self
            .transport
            .request(Request::new(Method::GET, endpoint).timeout(timeout))
            .await?
            .ensure_status(RestOperation::List, &[StatusCode::OK])?;

        let records = response.json::<Envelope<Vec<Record>>>()?.result;
        tracing::debug!(target: "rest", endpoint, count = records.len(), "Records fetched");
        Ok(records)
    }

    async fn create_record(
        &self,
        endpoint: &str,
        payload: &Value,
        check_mode: bool,
        timeout: Option<Duration>,
    ) -> Result<Record> {
        if check_mode {
            tracing::info!(target: "rest", endpoint, "Check mode, create skipped");
            return Ok(check_mode_placeholder());
        }
        self.mutate(
            Method::POST,
            RestOperation::Create,
            endpoint,
            payload,
            timeout,
            &[StatusCode::OK, StatusCode::CREATED],
        )
        .await
    }

    async fn update_record(
        &self,
        endpoint: &str,
        payload: &Value,
        check_mode: bool,
        timeout: Option<Duration>,
    ) -> Result<Record> {
        if check_mode {
            tracing::info!(target: "rest", endpoint, "Check mode, update skipped");
            return Ok(check_mode_placeholder());
        }
        self.mutate(
            Method::PATCH,
            RestOperation::Update,
            endpoint,
            payload,
            timeout,
            &[StatusCode::OK],
        )
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
        if check_mode {
            tracing::info!(target: "rest", endpoint, "Check mode, put skipped");
            return Ok(None);
        }

        let mut request = Request::new(Method::PUT, endpoint).timeout(timeout);
        if let Some(payload) = payload {
            request = request.json(payload);
        }
        if let Some(data) = binary_data {
            request = request.binary(data);
        }
        if let Some(headers) = headers {
            request = request.headers(headers);
        }

        let response = self.transport.request(request).await?.ensure_status(
            RestOperation::Put,
            &[StatusCode::OK, StatusCode::CREATED, StatusCode::NO_CONTENT],
        )?;
        if response.is_empty() {
            return Ok(None);
        }

        let record = unwrap_result(response.json::<Value>()?, RestOperation::Put, response.status)?;
        Ok(Some(record))
    }

    async fn delete_record(
        &self,
        endpoint: &str,
        check_mode: bool,
        timeout: Option<Duration>,
    ) -> Result<Option<Record>> {
        if check_mode {
            tracing::info!(target: "rest", endpoint, "Check mode, delete skipped");
            return Ok(None);
        }

        let response = self
            .transport
            .request(Request::new(Method::DELETE, endpoint).timeout(timeout))
            .await?
            .ensure_status(RestOperation::Delete, &[StatusCode::OK, StatusCode::NO_CONTENT])?;
        tracing::debug!(target: "rest", endpoint, "Record deleted");
        if response.is_empty() {
            return Ok(None);
        }

        let record =
            unwrap_result(response.json::<Value>()?, RestOperation::Delete, response.status)?;
        Ok(Some(record))
    }
}
