//! Domain types for the exporter.
//!
//! This module contains the core data structures:
//! - Catalog: projections of the remote catalog (sections, items, media parts)
//! - Artifact: document pairs, asset kinds and export targets

pub mod artifact;
pub mod catalog;

// Re-export commonly used types
pub use artifact::{AssetKind, DocumentPair, ExportTarget};
pub use catalog::{CatalogItem, LibrarySection, Location, Media, MediaContainer, MediaKind, Node, Part};
