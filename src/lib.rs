//! plex-export - Mirror a Plex catalog onto the filesystem
//!
//! Walks every movie and TV library of a Plex Media Server and writes, next
//! to the media files themselves, the metadata of each node in both JSON and
//! XML form together with its cover art, background art and theme music.
//!
//! # Architecture
//!
//! The export is a strictly sequential depth-first walk:
//! - Library → Section → (Show → Season → Episode | Movie)
//! - Every output path is derived from catalog data plus a run tag
//! - Failures are recorded and skipped; only an unreachable root aborts
//!
//! # Modules
//!
//! - `adapters`: External system integrations (Plex HTTP API, filesystem)
//! - `core`: Traversal engine, path derivation, retry policy, run report
//! - `domain`: Data structures (catalog items, export targets)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! export PLEX_ADDRESS=http://plex.local:32400
//! export X_PLEX_TOKEN=...
//! export PLEX_ROOT_FOLDER=/mnt/media
//! plex-export
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{ArtifactWriter, CatalogClient, CatalogError, FsArtifactWriter, ListingRef, PlexClient};
pub use config::ExportConfig;
pub use core::{ExportError, ExportReport, Exporter, PathDeriver};
pub use domain::{AssetKind, CatalogItem, DocumentPair, ExportTarget, LibrarySection, MediaKind, Node};
