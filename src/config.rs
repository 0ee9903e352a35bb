use std::{env, fmt, path::PathBuf};

use url::Url;

use crate::error::LogsError;

pub const DEFAULT_REGION: &str = "eu-west-1";

/// Connection settings shared read-only by every component.
#[derive(Debug, Clone)]
pub struct Config {
    /// RDS instance identifier
    pub instance: String,
    pub region: String,
    /// Directory downloaded logs are written to
    pub output_dir: PathBuf,
    /// Replaces `https://rds.<region>.amazonaws.com` when set
    pub endpoint: Option<Url>,
    pub credentials: Option<Credentials>,
}

impl Config {
    /// Surrounding whitespace is stripped from `instance`.
    pub fn new(instance: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            instance: instance.into().trim().to_string(),
            region: region.into(),
            output_dir: PathBuf::from("."),
            endpoint: None,
            credentials: None,
        }
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Base URL of the RDS REST API for the configured region.
    pub fn endpoint_url(&self) -> Result<Url, LogsError> {
        match &self.endpoint {
            Some(endpoint) => Ok(endpoint.clone()),
            None => {
                let host = format!("https://rds.{}.amazonaws.com", self.region);
                Url::parse(&host)
                    .map_err(|e| LogsError::Config(format!("invalid region '{}': {}", self.region, e)))
            }
        }
    }

    /// Fails when no instance identifier was supplied.
    pub fn require_instance(&self) -> Result<&str, LogsError> {
        match self.instance.as_str() {
            "" => Err(LogsError::Config(
                "a database instance identifier is required (-d/--database)".to_string(),
            )),
            instance => Ok(instance),
        }
    }
}

/// Static AWS credentials, read once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Reads `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN`.
    /// Returns `None` unless both keys are set.
    pub fn from_env() -> Option<Self> {
        let access_key_id = read_var("AWS_ACCESS_KEY_ID")?;
        let secret_access_key = match read_var("AWS_SECRET_ACCESS_KEY") {
            Some(secret) => secret,
            None => {
                log::warn!("AWS_ACCESS_KEY_ID is set but AWS_SECRET_ACCESS_KEY is not");
                return None;
            }
        };

        Some(Self {
            access_key_id,
            secret_access_key,
            session_token: read_var("AWS_SESSION_TOKEN"),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &self.session_token.as_ref().map(|_| "** redacted **"))
            .finish()
    }
}

fn read_var(var_name: &str) -> Option<String> {
    match env::var(var_name) {
        Ok(value) if !value.is_empty() => Some(value),
        Ok(_) => None,
        Err(env::VarError::NotPresent) => None,
        Err(e) => {
            log::warn!("Error reading environment variable {}: {}", var_name, e);
            None
        }
    }
}
