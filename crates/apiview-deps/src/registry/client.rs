//! Registry HTTP client
//!
//! Provides a blocking HTTP client for a module registry speaking the Go
//! module proxy protocol.

use crate::coord::{escape_path, escape_version, CoordError, ModuleRef};
use reqwest::blocking::Client;
use std::io::Read;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum size of one module archive (500 MB, the proxy's own limit)
pub const MAX_ARCHIVE_SIZE: u64 = 500 * 1024 * 1024;

/// Maximum number of body bytes kept in a failure report
const MAX_ERROR_BODY: u64 = 4 * 1024;

/// Errors that can occur during registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request exceeded the configured timeout
    #[error("Timed out fetching {0}")]
    Timeout(String),

    /// Non-success HTTP status
    #[error("HTTP {status} for {url}: {body}")]
    HttpStatus {
        status: u16,
        url: String,
        body: String,
    },

    /// Content too large
    #[error("Archive too large: {size} bytes (max: {max})")]
    ContentTooLarge { size: u64, max: u64 },

    /// IO error while reading the body
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid coordinate
    #[error("Invalid module coordinate: {0}")]
    Coord(#[from] CoordError),
}

impl RegistryError {
    /// Whether retrying the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            RegistryError::Timeout(_) | RegistryError::HttpError(_) => true,
            RegistryError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Something that can produce the zip archive of a module
///
/// The fetcher only talks to this trait, so tests can substitute an in-memory
/// source and count requests.
pub trait ArchiveSource: Send + Sync {
    /// Download the archive of one coordinate
    fn fetch_archive(&self, module: &ModuleRef) -> Result<Vec<u8>, RegistryError>;
}

/// Registry client for downloading module archives
pub struct RegistryClient {
    /// HTTP client
    client: Client,

    /// Base URL for the registry
    base_url: String,

    max_size: u64,
}

impl RegistryClient {
    /// Create a registry client with a bounded request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("apiview-go/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_size: MAX_ARCHIVE_SIZE,
        })
    }

    /// Registry base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Archive URL of a coordinate
    ///
    /// GET /{escaped-module-path}/@v/{escaped-version}.zip
    pub fn archive_url(&self, module: &ModuleRef) -> Result<String, RegistryError> {
        Ok(format!(
            "{}/{}/@v/{}.zip",
            self.base_url,
            escape_path(&module.path)?,
            escape_version(&module.version)?
        ))
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, RegistryError> {
        let response = self.client.get(url).send().map_err(|e| classify(e, url))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let mut body = String::new();
            let _ = response.take(MAX_ERROR_BODY).read_to_string(&mut body);
            return Err(RegistryError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
                body: body.trim().to_string(),
            });
        }

        if let Some(len) = response.content_length() {
            if len > self.max_size {
                return Err(RegistryError::ContentTooLarge {
                    size: len,
                    max: self.max_size,
                });
            }
        }

        let mut content = Vec::new();
        let mut reader = response.take(self.max_size + 1);
        reader.read_to_end(&mut content).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                RegistryError::Timeout(url.to_string())
            } else {
                RegistryError::IoError(e)
            }
        })?;

        if content.len() as u64 > self.max_size {
            return Err(RegistryError::ContentTooLarge {
                size: content.len() as u64,
                max: self.max_size,
            });
        }

        Ok(content)
    }
}

impl ArchiveSource for RegistryClient {
    fn fetch_archive(&self, module: &ModuleRef) -> Result<Vec<u8>, RegistryError> {
        let url = self.archive_url(module)?;
        debug!(%url, "downloading module archive");
        let result = self.download(&url);
        if let Err(e) = &result {
            warn!(module = %module, error = %e, "module download failed");
        }
        result
    }
}

fn classify(error: reqwest::Error, url: &str) -> RegistryError {
    if error.is_timeout() {
        RegistryError::Timeout(url.to_string())
    } else {
        RegistryError::HttpError(error)
    }
}
