//! Failure taxonomy and run summary of an export.

use serde::Serialize;
use thiserror::Error;

use crate::adapters::WriteError;
use crate::domain::{AssetKind, MediaKind};

/// Everything that can go wrong during an export.
///
/// Only [`ExportError::Fatal`] ends a run. Every other variant is recorded in
/// the [`ExportReport`] and the traversal moves on to the next sibling.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The catalog root could not be fetched or read
    #[error("catalog root unavailable: {0}")]
    Fatal(String),

    /// A section listing could not be fetched or read
    #[error("section '{section}' unavailable: {reason}")]
    Section { section: String, reason: String },

    /// Metadata or children of a single node could not be fetched or read
    #[error("{kind} {rating_key} unavailable: {reason}")]
    ItemFetch {
        kind: MediaKind,
        rating_key: String,
        reason: String,
    },

    /// An image or theme could not be fetched or stored
    #[error("{asset:?} for '{entity}' failed: {message}")]
    Asset {
        asset: AssetKind,
        entity: String,
        message: String,
    },

    /// A response arrived but its JSON form could not be read
    #[error("unreadable {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] WriteError),
}

/// Counters and failures of one export run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    pub run_tag: String,
    pub sections_exported: usize,
    pub sections_skipped: usize,
    pub sections_failed: usize,
    pub items_exported: usize,
    pub items_failed: usize,
    pub documents_written: usize,
    pub assets_written: usize,
    pub assets_failed: usize,
    pub write_failures: usize,
    pub decode_failures: usize,

    /// Human-readable description of every failure, in order
    pub failures: Vec<String>,
}

impl ExportReport {
    pub fn new(run_tag: impl Into<String>) -> Self {
        Self {
            run_tag: run_tag.into(),
            ..Default::default()
        }
    }

    /// Record a non-fatal failure and bump the matching counter
    pub fn record(&mut self, error: &ExportError) {
        match error {
            ExportError::Fatal(_) => {}
            ExportError::Section { .. } => self.sections_failed += 1,
            ExportError::ItemFetch { .. } => self.items_failed += 1,
            ExportError::Asset { .. } => self.assets_failed += 1,
            ExportError::Io(_) => self.write_failures += 1,
            ExportError::Decode { .. } => self.decode_failures += 1,
        }
        self.failures.push(error.to_string());
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
