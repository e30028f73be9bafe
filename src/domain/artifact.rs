//! Artifacts written for each exported node.
//!
//! Every node produces a document pair (`{base}.json` and `{base}.xml`) and
//! optionally cover art, background art and theme audio next to it.

use std::path::PathBuf;

use serde::Serialize;

use super::catalog::CatalogItem;

/// Both representations of one catalog response, kept verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPair {
    /// Structured (JSON) form
    pub json: String,

    /// Markup (XML) form
    pub xml: String,
}

impl DocumentPair {
    pub fn new(json: impl Into<String>, xml: impl Into<String>) -> Self {
        Self {
            json: json.into(),
            xml: xml.into(),
        }
    }
}

/// Binary assets a node may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Cover art
    Thumb,

    /// Background art
    Art,

    /// Theme music
    Theme,
}

impl AssetKind {
    /// Filename suffix appended to the base name
    pub fn suffix(self) -> &'static str {
        match self {
            AssetKind::Thumb => "-thumb.jpg",
            AssetKind::Art => "-art.jpg",
            AssetKind::Theme => "-theme.mp3",
        }
    }

    /// The server-side reference of this asset on an item, if present
    pub fn reference(self, item: &CatalogItem) -> Option<&str> {
        let reference = match self {
            AssetKind::Thumb => item.thumb.as_deref(),
            AssetKind::Art => item.art.as_deref(),
            AssetKind::Theme => item.theme.as_deref(),
        };
        reference.filter(|r| !r.is_empty())
    }
}

/// Where the artifacts of one node go
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExportTarget {
    pub directory: PathBuf,
    pub base_name: String,
}

impl ExportTarget {
    pub fn new(directory: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            base_name: base_name.into(),
        }
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        self.directory.join(format!("{}{}", self.base_name, suffix))
    }

    pub fn json_path(&self) -> PathBuf {
        self.with_suffix(".json")
    }

    pub fn xml_path(&self) -> PathBuf {
        self.with_suffix(".xml")
    }

    pub fn asset_path(&self, kind: AssetKind) -> PathBuf {
        self.with_suffix(kind.suffix())
    }
}
