//! HTTP client for the Plex Media Server API.
//!
//! Every document is requested twice, once as JSON and once as XML, with
//! the token passed as the `X-Plex-Token` query parameter. The token is only
//! ever sent to the server's own origin; absolute asset references pointing
//! elsewhere are fetched without it. Transient failures are retried
//! according to the configured [`RetryPolicy`].

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use tracing::debug;

use super::{entity_path, AssetStream, CatalogClient, CatalogError, ListingRef};
use crate::config::ExportConfig;
use crate::core::retry::{retry_transient, RetryPolicy};
use crate::domain::DocumentPair;

const ACCEPT_JSON: &str = "application/json";
const ACCEPT_XML: &str = "application/xml";
const ACCEPT_ANY: &str = "*/*";

/// Plex catalog client
pub struct PlexClient {
    /// Server address without trailing slash
    base_url: String,
    /// X-Plex-Token
    token: String,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl PlexClient {
    /// Create a new client
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            retry,
            client,
        })
    }

    /// Create from the run configuration
    pub fn from_config(config: &ExportConfig) -> Result<Self> {
        Self::new(
            config.server_address.clone(),
            config.auth_token.clone(),
            config.retry.clone(),
            config.request_timeout,
        )
    }

    /// Absolute URL for a server path, and whether it belongs to the server.
    /// Asset references may already be absolute.
    fn resolve(&self, path: &str) -> Result<(Url, bool), CatalogError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            let base = Url::parse(&self.base_url).map_err(|e| invalid_url(path, e))?;
            let url = Url::parse(path).map_err(|e| invalid_url(path, e))?;
            let own = url.origin() == base.origin();
            Ok((url, own))
        } else {
            let url = Url::parse(&format!("{}{}", self.base_url, path))
                .map_err(|e| invalid_url(path, e))?;
            Ok((url, true))
        }
    }

    /// Send one GET and map a non-success status to a [`CatalogError`]
    async fn send(
        &self,
        path: &str,
        accept: &str,
        empty_on_bad_request: bool,
    ) -> Result<reqwest::Response, CatalogError> {
        debug!(path, accept, "GET");

        let (url, own) = self.resolve(path)?;
        let mut request = self.client.get(url).header(ACCEPT, accept);
        if own {
            request = request.query(&[("X-Plex-Token", self.token.as_str())]);
        } else {
            debug!(path, "Reference points off-server, sending without token");
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify_transport(path, e))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(classify_status(path, status, empty_on_bad_request))
        }
    }

    async fn get_text(
        &self,
        path: &str,
        accept: &str,
        empty_on_bad_request: bool,
    ) -> Result<String, CatalogError> {
        retry_transient(&self.retry, || async move {
            let response = self.send(path, accept, empty_on_bad_request).await?;
            response
                .text()
                .await
                .map_err(|e| classify_transport(path, e))
        })
        .await
    }

    async fn fetch_pair(
        &self,
        path: &str,
        empty_on_bad_request: bool,
    ) -> Result<DocumentPair, CatalogError> {
        let json = self.get_text(path, ACCEPT_JSON, empty_on_bad_request).await?;
        let xml = self.get_text(path, ACCEPT_XML, empty_on_bad_request).await?;
        Ok(DocumentPair { json, xml })
    }
}

#[async_trait]
impl CatalogClient for PlexClient {
    async fn fetch_listing(&self, listing: &ListingRef) -> Result<DocumentPair, CatalogError> {
        // Plex answers 400 for the children of a node that has none
        let empty_on_bad_request = matches!(listing, ListingRef::Children(_));

        self.fetch_pair(&listing.path(), empty_on_bad_request)
            .await
            .map_err(|e| match e {
                CatalogError::NoChildren(_) => CatalogError::NoChildren(listing.to_string()),
                other => other,
            })
    }

    async fn fetch_entity(&self, rating_key: &str) -> Result<DocumentPair, CatalogError> {
        self.fetch_pair(&entity_path(rating_key), false).await
    }

    async fn fetch_asset(&self, reference: &str) -> Result<AssetStream, CatalogError> {
        let response = retry_transient(&self.retry, move || {
            self.send(reference, ACCEPT_ANY, false)
        })
        .await?;

        let path = reference.to_string();
        let stream = response.bytes_stream().map(move |chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| classify_transport(&path, e))
        });

        Ok(stream.boxed())
    }
}

fn classify_status(path: &str, status: StatusCode, empty_on_bad_request: bool) -> CatalogError {
    if empty_on_bad_request && status == StatusCode::BAD_REQUEST {
        return CatalogError::NoChildren(path.to_string());
    }

    let message = status.to_string();
    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        CatalogError::Transient {
            path: path.to_string(),
            message,
        }
    } else {
        CatalogError::Fatal {
            path: path.to_string(),
            message,
        }
    }
}

fn invalid_url(path: &str, err: impl std::fmt::Display) -> CatalogError {
    CatalogError::Fatal {
        path: path.to_string(),
        message: format!("invalid URL: {}", err),
    }
}

fn classify_transport(path: &str, err: reqwest::Error) -> CatalogError {
    let transient = err.is_timeout() || err.is_connect() || err.is_body();
    // The URL carries the token
    let message = err.without_url().to_string();

    if transient {
        CatalogError::Transient {
            path: path.to_string(),
            message,
        }
    } else {
        CatalogError::Fatal {
            path: path.to_string(),
            message,
        }
    }
}
