//! Shared test utilities: an in-memory catalog and response fixtures.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};

use plex_export::adapters::AssetStream;
use plex_export::config::SUPPORTED_KINDS;
use plex_export::core::RetryPolicy;
use plex_export::{CatalogClient, CatalogError, DocumentPair, ExportConfig, ListingRef};

pub const TAG: &str = "run1";

/// Configuration exporting into `root` with tag [`TAG`]
pub fn config(root: &Path) -> ExportConfig {
    ExportConfig {
        server_address: "http://plex.test:32400".to_string(),
        auth_token: "token".to_string(),
        export_root: root.to_string_lossy().into_owned(),
        run_tag: TAG.to_string(),
        supported_kinds: SUPPORTED_KINDS.to_vec(),
        retry: RetryPolicy::default(),
        request_timeout: Duration::from_secs(5),
        progress_interval: 10,
        config_file: None,
    }
}

/// Create `rel` (a server-side absolute path) under `root`
pub fn mkdirs(root: &Path, rel: &str) {
    std::fs::create_dir_all(root.join(rel.trim_start_matches('/'))).unwrap();
}

/// Path of an exported file under `root`
pub fn exported(root: &Path, rel: &str) -> std::path::PathBuf {
    root.join(rel.trim_start_matches('/'))
}

fn not_found(path: String) -> CatalogError {
    CatalogError::Fatal {
        path,
        message: "404 Not Found".to_string(),
    }
}

/// Markup form of a document, tagged so tests can tell documents apart
pub fn xml_for(label: &str) -> String {
    format!("<MediaContainer source=\"{}\"/>", label)
}

/// In-memory [`CatalogClient`] that records every request
#[derive(Default)]
pub struct MockCatalog {
    listings: HashMap<ListingRef, Result<DocumentPair, CatalogError>>,
    entities: HashMap<String, Result<DocumentPair, CatalogError>>,
    assets: HashMap<String, Result<Vec<u8>, CatalogError>>,
    calls: Mutex<Vec<String>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(mut self, listing: ListingRef, body: Value) -> Self {
        let xml = xml_for(&listing.to_string());
        self.listings
            .insert(listing, Ok(DocumentPair::new(body.to_string(), xml)));
        self
    }

    pub fn with_listing_error(mut self, listing: ListingRef, error: CatalogError) -> Self {
        self.listings.insert(listing, Err(error));
        self
    }

    pub fn with_entity(mut self, rating_key: &str, body: Value) -> Self {
        self.entities.insert(
            rating_key.to_string(),
            Ok(DocumentPair::new(body.to_string(), xml_for(rating_key))),
        );
        self
    }

    pub fn with_entity_error(mut self, rating_key: &str, error: CatalogError) -> Self {
        self.entities.insert(rating_key.to_string(), Err(error));
        self
    }

    pub fn with_asset(mut self, reference: &str, bytes: &[u8]) -> Self {
        self.assets.insert(reference.to_string(), Ok(bytes.to_vec()));
        self
    }

    pub fn with_asset_error(mut self, reference: &str, error: CatalogError) -> Self {
        self.assets.insert(reference.to_string(), Err(error));
        self
    }

    /// Every request made so far, e.g. `listing:section 1`, `entity:10`, `asset:/thumb/10`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CatalogClient for MockCatalog {
    async fn fetch_listing(&self, listing: &ListingRef) -> Result<DocumentPair, CatalogError> {
        self.record(format!("listing:{}", listing));
        self.listings
            .get(listing)
            .cloned()
            .unwrap_or_else(|| Err(not_found(listing.path())))
    }

    async fn fetch_entity(&self, rating_key: &str) -> Result<DocumentPair, CatalogError> {
        self.record(format!("entity:{}", rating_key));
        self.entities
            .get(rating_key)
            .cloned()
            .unwrap_or_else(|| Err(not_found(rating_key.to_string())))
    }

    async fn fetch_asset(&self, reference: &str) -> Result<AssetStream, CatalogError> {
        self.record(format!("asset:{}", reference));
        let bytes = self
            .assets
            .get(reference)
            .cloned()
            .unwrap_or_else(|| Err(not_found(reference.to_string())))?;

        // Two chunks, like a real body would arrive
        let mid = bytes.len() / 2;
        let chunks = vec![Ok(bytes[..mid].to_vec()), Ok(bytes[mid..].to_vec())];
        Ok(stream::iter(chunks).boxed())
    }
}

/// Response fixtures shaped like Plex JSON
pub mod fixtures {
    use super::*;

    pub fn root(sections: Vec<Value>) -> Value {
        json!({
            "MediaContainer": {
                "size": sections.len(),
                "title1": "Plex Library",
                "viewGroup": "secondary",
                "Directory": sections
            }
        })
    }

    pub fn section(key: &str, title: &str, kind: &str, locations: &[&str]) -> Value {
        let locations: Vec<Value> = locations.iter().map(|p| json!({ "path": p })).collect();
        json!({ "key": key, "title": title, "type": kind, "Location": locations })
    }

    /// Listing of child items by rating key
    pub fn listing(title: &str, keys: &[&str]) -> Value {
        let items: Vec<Value> = keys.iter().map(|k| json!({ "ratingKey": k })).collect();
        json!({ "MediaContainer": { "size": items.len(), "title1": title, "Metadata": items } })
    }

    fn entity(item: Value) -> Value {
        json!({ "MediaContainer": { "size": 1, "Metadata": [item] } })
    }

    pub fn show(key: &str, title: &str, location: &str) -> Value {
        entity(json!({
            "ratingKey": key,
            "type": "show",
            "title": title,
            "librarySectionTitle": "TV",
            "thumb": format!("/thumb/{}", key),
            "art": format!("/art/{}", key),
            "Location": [{ "path": location }]
        }))
    }

    pub fn season(key: &str, title: &str, index: u32) -> Value {
        entity(json!({
            "ratingKey": key,
            "type": "season",
            "title": title,
            "index": index,
            "librarySectionTitle": "TV",
            "parentTitle": "Show",
            "thumb": format!("/thumb/{}", key)
        }))
    }

    pub fn episode(key: &str, title: &str, index: u32, file: &str) -> Value {
        entity(json!({
            "ratingKey": key,
            "type": "episode",
            "title": title,
            "index": index,
            "parentIndex": 1,
            "librarySectionTitle": "TV",
            "grandparentTitle": "Show",
            "Media": [{ "Part": [{ "file": file }] }]
        }))
    }

    pub fn movie(key: &str, title: &str, files: &[&str]) -> Value {
        let parts: Vec<Value> = files.iter().map(|f| json!({ "file": f })).collect();
        entity(json!({
            "ratingKey": key,
            "type": "movie",
            "title": title,
            "librarySectionTitle": "Movies",
            "thumb": format!("/thumb/{}", key),
            "art": format!("/art/{}", key),
            "Media": [{ "Part": parts }]
        }))
    }

    /// Add a theme reference to the first metadata entry of an entity
    pub fn with_theme(mut entity: Value, theme: &str) -> Value {
        entity["MediaContainer"]["Metadata"][0]["theme"] = json!(theme);
        entity
    }
}
