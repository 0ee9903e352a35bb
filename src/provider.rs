//! Access to the RDS management API.
//!
//! [`LogProvider`] is the seam the enumerator and the follower talk to.
//! [`RdsProvider`] backs it with the AWS SDK; tests use in-memory doubles.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_rds::{error::DisplayErrorContext, Client};

use crate::{config::Config, error::LogsError};

/// A log file as reported by DescribeDBLogFiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDescriptor {
    /// Full log path, usually `<category>/<filename>`
    pub name: String,
    pub size: Option<i64>,
    /// Last write time in epoch milliseconds
    pub last_written: Option<i64>,
}

impl LogDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            last_written: None,
        }
    }
}

/// One response of DownloadDBLogFilePortion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogPortion {
    pub data: Option<String>,
    pub marker: Option<String>,
    /// AdditionalDataPending
    pub pending: bool,
}

#[async_trait]
pub trait LogProvider: Send + Sync {
    /// Lists the log files of `instance` whose name contains `filter`,
    /// in the order the provider returns them.
    async fn describe_log_files(
        &self,
        instance: &str,
        filter: &str,
    ) -> Result<Vec<LogDescriptor>, LogsError>;

    /// Fetches up to `lines` lines of `log_name` starting at `marker`.
    async fn download_log_portion(
        &self,
        instance: &str,
        log_name: &str,
        marker: &str,
        lines: i32,
    ) -> Result<LogPortion, LogsError>;
}

#[async_trait]
impl<P: LogProvider + ?Sized> LogProvider for &P {
    async fn describe_log_files(
        &self,
        instance: &str,
        filter: &str,
    ) -> Result<Vec<LogDescriptor>, LogsError> {
        (**self).describe_log_files(instance, filter).await
    }

    async fn download_log_portion(
        &self,
        instance: &str,
        log_name: &str,
        marker: &str,
        lines: i32,
    ) -> Result<LogPortion, LogsError> {
        (**self)
            .download_log_portion(instance, log_name, marker, lines)
            .await
    }
}

/// [`LogProvider`] backed by the AWS SDK.
#[derive(Debug, Clone)]
pub struct RdsProvider {
    client: Client,
}

impl RdsProvider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn from_config(config: &Config) -> Self {
        Self::new(create_rds_client(config).await)
    }
}

/// Creates an RDS client for the configured region, endpoint and credentials.
pub async fn create_rds_client(config: &Config) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()));

    if let Some(endpoint) = &config.endpoint {
        loader = loader.endpoint_url(endpoint.as_str());
    }

    if let Some(credentials) = &config.credentials {
        let credentials = aws_sdk_rds::config::Credentials::new(
            &credentials.access_key_id,
            &credentials.secret_access_key,
            credentials.session_token.clone(),
            None,
            "rds-logs",
        );
        loader = loader.credentials_provider(credentials);
    }

    Client::new(&loader.load().await)
}

fn provider_error<E: std::error::Error>(operation: &str, err: E) -> LogsError {
    LogsError::Provider(format!("{}: {}", operation, DisplayErrorContext(err)))
}

#[async_trait]
impl LogProvider for RdsProvider {
    async fn describe_log_files(
        &self,
        instance: &str,
        filter: &str,
    ) -> Result<Vec<LogDescriptor>, LogsError> {
        let mut descriptors = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let output = self
                .client
                .describe_db_log_files()
                .db_instance_identifier(instance)
                .set_filename_contains((!filter.is_empty()).then(|| filter.to_string()))
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| provider_error("DescribeDBLogFiles", e))?;

            descriptors.extend(output.describe_db_log_files().iter().filter_map(|details| {
                details.log_file_name().map(|name| LogDescriptor {
                    name: name.to_string(),
                    size: Option::<i64>::from(details.size()),
                    last_written: Option::<i64>::from(details.last_written()),
                })
            }));

            match output.marker() {
                Some(next) if !next.is_empty() => {
                    log::debug!("DescribeDBLogFiles has more results after {}", next);
                    marker = Some(next.to_string());
                }
                _ => break,
            }
        }

        Ok(descriptors)
    }

    async fn download_log_portion(
        &self,
        instance: &str,
        log_name: &str,
        marker: &str,
        lines: i32,
    ) -> Result<LogPortion, LogsError> {
        let output = self
            .client
            .download_db_log_file_portion()
            .db_instance_identifier(instance)
            .log_file_name(log_name)
            .marker(marker)
            .number_of_lines(lines)
            .send()
            .await
            .map_err(|e| provider_error("DownloadDBLogFilePortion", e))?;

        Ok(LogPortion {
            data: output.log_file_data().map(str::to_string),
            marker: output.marker().map(str::to_string),
            pending: Option::<bool>::from(output.additional_data_pending()).unwrap_or(false),
        })
    }
}
