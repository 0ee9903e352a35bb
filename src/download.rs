//! Complete log downloads through the RDS REST endpoint.
//!
//! The SDK has no operation for `downloadCompleteLogFile`, so the request is
//! built by hand, signed with SigV4 and its body streamed to disk.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{stream::TryStreamExt, Stream};
use object_store::aws::{AwsAuthorizer, AwsCredential};
use reqwest::{header::HeaderMap, Method};
use tokio::{fs::File, io::AsyncWriteExt};
use url::Url;

use crate::{
    config::{Config, Credentials},
    error::LogsError,
    utils::{download_path, output_path},
};

pub const SIGNING_SERVICE: &str = "rds";

/// A signed GET for one complete log file.
#[derive(Debug)]
pub struct DownloadRequest {
    request: reqwest::Request,
}

impl DownloadRequest {
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn url(&self) -> &Url {
        self.request.url()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// Signing time, `YYYYMMDDTHHMMSSZ`
    pub fn timestamp(&self) -> Option<&str> {
        self.headers()
            .get("x-amz-date")
            .and_then(|v| v.to_str().ok())
    }

    pub fn into_inner(self) -> reqwest::Request {
        self.request
    }
}

pub struct LogDownloader {
    client: reqwest::Client,
    config: Config,
    credential: AwsCredential,
}

impl LogDownloader {
    pub fn new(config: Config) -> Result<Self, LogsError> {
        let credentials = config.credentials.as_ref().ok_or_else(|| {
            LogsError::Signing(
                "no AWS credentials; set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY".to_string(),
            )
        })?;
        let credential = signing_credential(credentials)?;

        Ok(Self {
            client: reqwest::Client::builder().build()?,
            config,
            credential,
        })
    }

    /// Builds and signs the GET for `log_name` at the current time.
    pub fn build_request(&self, log_name: &str) -> Result<DownloadRequest, LogsError> {
        let instance = self.config.require_instance()?;

        let mut url = self.config.endpoint_url()?;
        url.set_path(&download_path(instance, log_name));

        let mut request = self.client.get(url).build()?;
        AwsAuthorizer::new(&self.credential, SIGNING_SERVICE, &self.config.region)
            .authorize(&mut request, None);

        Ok(DownloadRequest { request })
    }

    /// Downloads `log_name` into the output directory and returns the path
    /// of the written file. The body is staged next to the target, so a
    /// failed transfer leaves any earlier copy untouched.
    pub async fn download(&self, log_name: &str) -> Result<PathBuf, LogsError> {
        let output_path = output_path(&self.config.output_dir, log_name)?;
        let request = self.build_request(log_name)?;
        let request_path = request.url().path().to_string();

        let response = self.client.execute(request.into_inner()).await?;
        log::info!(
            "Download request completed with status: {} > {}",
            response.status(),
            request_path
        );
        let response = response.error_for_status()?;

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LogsError::local_io(parent, e))?;
        }

        let partial = partial_path(&output_path);
        let file = File::create(&partial)
            .await
            .map_err(|e| LogsError::local_io(&partial, e))?;

        let written = match write_body(response.bytes_stream(), file, &partial).await {
            Ok(written) => written,
            Err(e) => {
                remove_partial(&partial).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&partial, &output_path).await {
            remove_partial(&partial).await;
            return Err(LogsError::local_io(&output_path, e));
        }

        log::info!("Wrote {} bytes to {}", written, output_path.display());
        Ok(output_path)
    }
}

/// Sibling of `path` the body is staged in until the transfer completes.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

async fn remove_partial(partial: &Path) {
    if let Err(rm) = tokio::fs::remove_file(partial).await {
        log::warn!(
            "unable to remove partial download {}: {}",
            partial.display(),
            rm
        );
    }
}

fn signing_credential(credentials: &Credentials) -> Result<AwsCredential, LogsError> {
    // the signer expects every value to be a valid header
    for (name, value) in [
        ("access key id", Some(&credentials.access_key_id)),
        ("session token", credentials.session_token.as_ref()),
    ] {
        if let Some(value) = value {
            reqwest::header::HeaderValue::from_str(value)
                .map_err(|e| LogsError::Signing(format!("invalid {}: {}", name, e)))?;
        }
    }

    Ok(AwsCredential {
        key_id: credentials.access_key_id.clone(),
        secret_key: credentials.secret_access_key.clone(),
        token: credentials.session_token.clone(),
    })
}

/// Copies `stream` into `file`. The file is closed when this returns.
async fn write_body<S>(stream: S, mut file: File, path: &Path) -> Result<u64, LogsError>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>>,
{
    futures::pin_mut!(stream);

    let mut written = 0u64;
    while let Some(chunk) = stream.try_next().await? {
        file.write_all(&chunk)
            .await
            .map_err(|e| LogsError::local_io(path, e))?;
        written += chunk.len() as u64;
    }

    file.sync_all()
        .await
        .map_err(|e| LogsError::local_io(path, e))?;

    Ok(written)
}
