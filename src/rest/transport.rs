use crate::rest::types::Query;
use hypercore_common::prelude::{AuthError, Error, RestOperation, Result};
use reqwest::header::{
    ACCEPT, AUTHORIZATION, CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue,
};
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::OnceCell;

const LOGIN_PATH: &str = "/rest/v1/login";
const LOGOUT_PATH: &str = "/rest/v1/logout";

/// How the transport authenticates against the platform.
///
pub enum Auth {
    /// Username/password login that yields a `sessionID` cookie.
    Session {
        username: String,
        password: SecretString,
        use_oidc: bool,
    },
    /// The full, pre-formatted `Authorization` header value.
    Header(SecretString),
}

/// Normalized answer of a single HTTP call.
///
/// The body is kept as raw text; JSON decoding is up to the caller.
///
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub body: String,
    pub headers: HeaderMap,
}

impl Response {
    /// Decodes the body as JSON.
    ///
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }

    /// Passes the response through when its status is one of `accepted`.
    ///
    /// # Errors
    ///
    /// `Error::UnexpectedResponse` carrying the status and the body otherwise.
    ///
    pub fn ensure_status(self, operation: RestOperation, accepted: &[StatusCode]) -> Result<Self> {
        if accepted.contains(&self.status) {
            Ok(self)
        } else {
            Err(Error::UnexpectedResponse(operation, self.status, self.body))
        }
    }
}

/// Everything needed to issue one request.
///
pub struct Request<'a> {
    method: Method,
    path: &'a str,
    payload: Option<&'a Value>,
    query: Option<&'a Query>,
    timeout: Option<Duration>,
    binary: Option<Vec<u8>>,
    headers: Option<HeaderMap>,
}

impl<'a> Request<'a> {
    pub fn new(method: Method, path: &'a str) -> Self {
        Self {
            method,
            path,
            payload: None,
            query: None,
            timeout: None,
            binary: None,
            headers: None,
        }
    }

    pub fn json(mut self, payload: &'a Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sent as URL query parameters.
    pub fn query(mut self, query: &'a Query) -> Self {
        self.query = Some(query);
        self
    }

    /// Overrides the transport-wide timeout when set.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Raw body; takes precedence over a JSON payload.
    pub fn binary(mut self, data: Vec<u8>) -> Self {
        self.binary = Some(data);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(rename = "sessionID")]
    session_id: String,
}

// -----------------------------------------------------------------------------

/// HTTP transport to the platform REST API built on `reqwest`.
///
/// Performs exactly one request per call and never retries. Host and
/// credentials are fixed at construction; a login session is opened lazily on
/// the first request and reused afterwards.
///
pub struct Transport {
    client: OnceCell<Client>,
    session: OnceCell<SecretString>,
    host: String,
    auth: Auth,
    validate_certs: bool,
    timeout: Option<Duration>,
}

impl Transport {
    /// Creates a new transport.
    ///
    /// # Arguments
    ///
    /// * `host`: Scheme and authority of the platform, e.g.
    ///   `https://10.5.11.200`.
    /// * `auth`: Credentials used for every request.
    ///
    pub fn new(host: impl Into<String>, auth: Auth) -> Self {
        Self {
            client: OnceCell::new(),
            session: OnceCell::new(),
            host: host.into().trim_end_matches('/').to_owned(),
            auth,
            validate_certs: true,
            timeout: None,
        }
    }

    /// Toggles TLS certificate and hostname verification.
    ///
    pub fn with_validate_certs(mut self, validate_certs: bool) -> Self {
        self.validate_certs = validate_certs;
        self
    }

    /// Default timeout applied to every request.
    ///
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Client settings shared by every request of this transport.
    ///
    fn client_builder(&self) -> ClientBuilder {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let builder = Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(!self.validate_certs)
            .use_rustls_tls();
        match self.timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }

    /// Lazily initializes and returns a reference to the `reqwest::Client`.
    ///
    async fn get_client(&self) -> Result<&Client> {
        self.client
            .get_or_try_init(|| async { self.client_builder().build().map_err(Error::from) })
            .await
    }

    /// Returns the session identifier, logging in on first use.
    ///
    async fn session_id(&self) -> Result<&SecretString> {
        self.session.get_or_try_init(|| self.login()).await
    }

    async fn login(&self) -> Result<SecretString> {
        let Auth::Session {
            username,
            password,
            use_oidc,
        } = &self.auth
        else {
            return Err(Error::Auth(AuthError::Login));
        };

        let client = self.get_client().await?;
        let payload = json!({
            "username": username,
            "password": password.expose_secret(),
            "useOIDC": use_oidc,
        });
        let response = client
            .post(format!("{}{}", self.host, LOGIN_PATH))
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let login = response.json::<LoginResponse>().await?;
                tracing::info!(target: "transport", %username, "Session opened");
                Ok(login.session_id.into())
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                tracing::error!(target: "transport", %username, "Login rejected");
                Err(Error::Auth(AuthError::Login))
            }
            status => {
                let text = response.text().await?;
                Err(Error::UnexpectedResponse(RestOperation::Login, status, text))
            }
        }
    }

    /// Closes the login session, if one was opened.
    ///
    pub async fn logout(&self) -> Result<()> {
        let Some(session_id) = self.session.get() else {
            return Ok(());
        };

        let client = self.get_client().await?;
        let (name, value) = session_cookie(session_id)?;
        let response = client
            .post(format!("{}{}", self.host, LOGOUT_PATH))
            .header(name, value)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                tracing::info!(target: "transport", "Session closed");
                Ok(())
            }
            StatusCode::UNAUTHORIZED => Err(Error::Auth(AuthError::Logout)),
            status => {
                let text = response.text().await?;
                Err(Error::UnexpectedResponse(RestOperation::Logout, status, text))
            }
        }
    }

    async fn auth_header(&self) -> Result<(HeaderName, HeaderValue)> {
        match &self.auth {
            Auth::Header(header) => {
                let mut value = HeaderValue::from_str(header.expose_secret())?;
                value.set_sensitive(true);
                Ok((AUTHORIZATION, value))
            }
            Auth::Session { .. } => session_cookie(self.session_id().await?),
        }
    }

    /// Performs one request against the platform.
    ///
    /// # Errors
    ///
    /// `Error::Transport` on connection, TLS or timeout failures. HTTP error
    /// statuses are **not** errors here; see [`Response::ensure_status`].
    ///
    pub async fn request(&self, request: Request<'_>) -> Result<Response> {
        let client = self.get_client().await?;
        let (auth_name, auth_value) = self.auth_header().await?;
        let url = format!("{}{}", self.host, request.path);

        let mut builder = client
            .request(request.method.clone(), &url)
            .header(auth_name, auth_value);
        if let Some(query) = request.query {
            builder = builder.query(&query_pairs(query));
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        let has_content_type = request
            .headers
            .as_ref()
            .is_some_and(|headers| headers.contains_key(CONTENT_TYPE));
        if let Some(headers) = request.headers {
            builder = builder.headers(headers);
        }
        builder = match (request.binary, request.payload) {
            (Some(data), _) if has_content_type => builder.body(data),
            (Some(data), _) => builder
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(data),
            (None, Some(payload)) => builder.json(payload),
            (None, None) => builder,
        };

        tracing::debug!(target: "transport", method = %request.method, %url, "Sending request");
        let response = builder.send().await.inspect_err(|error| {
            tracing::error!(target: "transport", %url, ?error, "Request failed");
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        tracing::debug!(target: "transport", %status, %url, "Response received");

        Ok(Response {
            status,
            body,
            headers,
        })
    }
}

fn session_cookie(session_id: &SecretString) -> Result<(HeaderName, HeaderValue)> {
    let mut value = HeaderValue::from_str(&format!("sessionID={}", session_id.expose_secret()))?;
    value.set_sensitive(true);
    Ok((COOKIE, value))
}

fn query_pairs(query: &Query) -> Vec<(String, String)> {
    query
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}
