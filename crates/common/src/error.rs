use derive_more::Display;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Errors surfaced by the platform REST core.
///
/// None of them are swallowed inside the core: the module layer decides how
/// to report each one.
///
#[derive(Debug, Error)]
pub enum Error {
    #[error("Error: {0}")]
    Any(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Ambiguous: {0}")]
    Ambiguous(String),
    #[error("Timeout after: {0} seconds")]
    Timeout(f32),
    #[error("Authentication error: {0}")]
    Auth(AuthError),
    #[error("Platform API error: {0} failed: status {1}, body: {2}")]
    UnexpectedResponse(RestOperation, reqwest::StatusCode, String),
    #[error("Task failed: {0}")]
    TaskFailed(String),
    #[error("Malformed time window: {0}")]
    Window(String),
    #[error("Unknown time zone: {0}")]
    TimeZone(String),
    #[error("Outside maintenance window: {0}")]
    OutsideWindow(String),
    #[error("Header convert error: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Environment error: {0}")]
    Environment(#[from] dotenv::Error),
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Failed to set logger: {0}")]
    Logger(#[from] tracing::log::SetLoggerError),
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] tracing::dispatcher::SetGlobalDefaultError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Represents authentication-related errors.
///
#[derive(Debug, Display)]
pub enum AuthError {
    Login,
    Logout,
}

/// Platform API operation that received an unexpected response.
///
#[derive(Debug, Display, Clone, Copy, PartialEq)]
pub enum RestOperation {
    List,
    Create,
    Update,
    Put,
    Delete,
    Login,
    Logout,
}
