//! Byte sources for the remote NBCN resources.
//!
//! Every remote file (the station registry and the per-station CSVs) is read
//! through [`ByteSource`], so the pipeline can run against the live MeteoSwiss
//! endpoints ([`HttpSource`]) or against any other implementation, such as an
//! in-memory map in tests.

use encoding_rs::WINDOWS_1252;
use log::{info, warn};
use reqwest::Client;
use std::future::Future;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Resource '{url}' is unavailable: {reason}")]
    Unavailable { url: String, reason: String },
}

/// Fetches the raw bytes behind a URL.
///
/// A single call is a single attempt. Retrying is left to the caller.
pub trait ByteSource: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, SourceError>> + Send;
}

/// [`ByteSource`] backed by a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl ByteSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        info!("Downloading data from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::NetworkRequest(url.to_string(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    SourceError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    SourceError::NetworkRequest(url.to_string(), e)
                });
            }
        };

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::NetworkRequest(url.to_string(), e))?;
        info!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

/// The NBCN files are published in Windows-1252. Re-encodes them as UTF-8
/// so station names such as "Genève" survive CSV parsing.
pub(crate) fn decode_windows_1252(bytes: &[u8]) -> String {
    let (text, _, had_errors) = WINDOWS_1252.decode(bytes);
    if had_errors {
        warn!("Replaced undecodable bytes while decoding Windows-1252 input");
    }
    text.into_owned()
}
