//! Adapter interfaces for external systems.
//!
//! The exporter talks to two collaborators: the remote catalog it reads
//! from and the filesystem it writes to. Both sit behind traits so the
//! traversal can be driven against in-memory fakes.

pub mod plex;
pub mod writer;

use std::fmt;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::domain::DocumentPair;

// Re-export the concrete adapters
pub use plex::PlexClient;
pub use writer::{ArtifactWriter, FsArtifactWriter, WriteError};

/// Chunks of a binary asset as they arrive
pub type AssetStream = BoxStream<'static, Result<Vec<u8>, CatalogError>>;

/// Errors returned by a catalog client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The container has no children. An expected terminal state.
    #[error("{0} has no children")]
    NoChildren(String),

    /// Timeouts, connection drops, overloaded server
    #[error("transient failure fetching {path}: {message}")]
    Transient { path: String, message: String },

    #[error("request for {path} failed: {message}")]
    Fatal { path: String, message: String },
}

impl CatalogError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, CatalogError::Transient { .. })
    }
}

/// A container whose child listing can be fetched
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListingRef {
    /// All library sections
    Root,

    /// Items of a library section, by section key
    Section(String),

    /// Children of a show or season, by rating key
    Children(String),
}

impl ListingRef {
    /// Server path of the listing
    pub fn path(&self) -> String {
        match self {
            ListingRef::Root => "/library/sections/all".to_string(),
            ListingRef::Section(key) => format!("/library/sections/{}/all", key),
            ListingRef::Children(key) => format!("/library/metadata/{}/children", key),
        }
    }
}

impl fmt::Display for ListingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingRef::Root => write!(f, "catalog root"),
            ListingRef::Section(key) => write!(f, "section {}", key),
            ListingRef::Children(key) => write!(f, "item {}", key),
        }
    }
}

/// Server path of a single entity's metadata
pub fn entity_path(rating_key: &str) -> String {
    format!("/library/metadata/{}", rating_key)
}

/// Read access to the remote catalog
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch both representations of a container's children.
    ///
    /// Fails with [`CatalogError::NoChildren`] when the container is empty.
    async fn fetch_listing(&self, listing: &ListingRef) -> Result<DocumentPair, CatalogError>;

    /// Fetch both representations of a single entity's metadata
    async fn fetch_entity(&self, rating_key: &str) -> Result<DocumentPair, CatalogError>;

    /// Stream a cover, background or theme by its server reference
    async fn fetch_asset(&self, reference: &str) -> Result<AssetStream, CatalogError>;
}
