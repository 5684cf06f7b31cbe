use crate::rest::transport::Auth;
use crate::rest::types::MatchPolicy;
use crate::window::MaintenanceWindow;
use hypercore_common::prelude::{Error, Result};
use hypercore_common::telemetry;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::MakeWriter;

/// Represents the toolkit's configuration.
///
#[derive(Debug, Deserialize)]
pub struct Config {
    pub platform: PlatformConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub maintenance: Option<MaintenanceWindow>,
}

impl Config {
    /// Loads the configuration from files and environment variables.
    ///
    /// Layers, last one wins: `base.yaml`, the file of the current
    /// `APP_ENVIRONMENT`, then `APP__SECTION__KEY` variables. The directory is
    /// `APP_CONFIG_DIR`, `./configuration` by default.
    ///
    pub fn from_env() -> Result<Self> {
        match dotenv::dotenv() {
            Ok(path) => tracing::info!(target: "config", ?path, ".env loaded."),
            Err(error) if error.not_found() => tracing::debug!(target: "config", "No .env file."),
            Err(error) => return Err(error.into()),
        }

        let config_dir = std::env::var("APP_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("configuration"));
        let environment =
            Environment::from(std::env::var("APP_ENVIRONMENT").unwrap_or_default().as_str());

        let config = config::Config::builder()
            .add_source(config::File::from(config_dir.join("base.yaml")))
            .add_source(config::File::from(config_dir.join(environment.as_filename())).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize::<Config>()?;

        tracing::info!(target: "config", ?config, "Configuration loaded.");
        Ok(config)
    }

    /// Parses a configuration from a YAML document.
    ///
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()?
            .try_deserialize::<Config>()?)
    }
}

// -----------------------------------------------------------------------------

/// How a username and password are checked by the platform.
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    #[default]
    Local,
    Oidc,
}

/// All settings required to reach the platform API.
///
/// Either `auth_header` or both `username` and `password` must be set; the
/// header wins when both are present.
///
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    pub host: String,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    #[serde(default)]
    pub auth_method: AuthMethod,
    pub auth_header: Option<SecretString>,
    #[serde(default = "default_validate_certs")]
    pub validate_certs: bool,
    pub timeout_sec: Option<u64>,
    #[serde(default)]
    pub match_policy: MatchPolicy,
}

fn default_validate_certs() -> bool {
    true
}

impl PlatformConfig {
    /// Picks the transport credentials.
    ///
    pub fn auth(&self) -> Result<Auth> {
        if let Some(header) = &self.auth_header {
            return Ok(Auth::Header(header.clone()));
        }

        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Ok(Auth::Session {
                username: username.clone(),
                password: password.clone(),
                use_oidc: self.auth_method == AuthMethod::Oidc,
            }),
            (None, _) => Err(Error::NotFound("platform.username".to_owned())),
            (_, None) => Err(Error::NotFound("platform.password".to_owned())),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_sec.map(Duration::from_secs)
    }
}

/// Task polling settings.
///
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TasksConfig {
    pub poll_interval_ms: u64,
    pub timeout_sec: u64,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            timeout_sec: 600,
        }
    }
}

/// Log output settings.
///
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Parsed level, `INFO` when the configured value is not a level name.
    ///
    pub fn level(&self) -> Level {
        self.level.parse().unwrap_or_else(|_| {
            tracing::warn!(target: "config", level = %self.level, "Unknown log level, using info.");
            Level::INFO
        })
    }

    /// Composes the subscriber described by this section.
    ///
    pub fn subscriber<Sink>(&self, sink: Sink) -> Box<dyn Subscriber + Sync + Send>
    where
        Sink: for<'a> MakeWriter<'a> + Sync + Send + 'static,
    {
        telemetry::get_subscriber(self.level(), self.json, sink)
    }

    /// Installs the subscriber globally, writing to stdout.
    ///
    /// # Warning
    ///
    /// Call this **once** per process.
    ///
    pub fn init(&self) -> Result<()> {
        telemetry::init_subscriber(self.subscriber(std::io::stdout))
    }
}

// -----------------------------------------------------------------------------

/// Represents the different environments the toolkit can run in.
///
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    /// Returns the filename for the environment-specific configuration file.
    ///
    pub fn as_filename(&self) -> &'static str {
        match self {
            Self::Local => "local.yaml",
            Self::Production => "production.yaml",
        }
    }
}

impl From<&str> for Environment {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" => Self::Production,
            "local" | "" => Self::Local,
            other => {
                tracing::warn!(target: "config", value = other, "Incorrect environment format. Use either `local` or `production`.");
                Self::Local
            }
        }
    }
}
