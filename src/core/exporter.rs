//! Traversal engine.
//!
//! Walks the catalog depth-first, one node at a time:
//! Library → Section → (Show → Season → Episode | Movie). Each node fetches
//! its own metadata, writes its document pair and assets, then descends.
//!
//! Failures stay at the level they happen on. Only an unreachable catalog
//! root aborts the run; everything else is logged, recorded in the
//! [`ExportReport`] and the next sibling is processed.

use chrono::Utc;
use futures::future::BoxFuture;
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::{ArtifactWriter, CatalogClient, CatalogError, ListingRef};
use crate::config::ExportConfig;
use crate::domain::{AssetKind, CatalogItem, DocumentPair, ExportTarget, LibrarySection, MediaContainer, MediaKind, Node};

use super::paths::PathDeriver;
use super::report::{ExportError, ExportReport};

const SHOW_ASSETS: [AssetKind; 3] = [AssetKind::Thumb, AssetKind::Art, AssetKind::Theme];
const SEASON_ASSETS: [AssetKind; 2] = [AssetKind::Thumb, AssetKind::Art];
const MEDIA_ASSETS: [AssetKind; 3] = [AssetKind::Thumb, AssetKind::Art, AssetKind::Theme];

/// Outcome of visiting one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visit {
    /// Node handled, or skipped after logging why
    Done,

    /// An episode resolved to this media file (server-side path)
    Located(String),
}

/// Exports one catalog into the filesystem
pub struct Exporter<'a> {
    config: &'a ExportConfig,
    client: &'a dyn CatalogClient,
    writer: &'a dyn ArtifactWriter,
    paths: PathDeriver,
    progress_interval: usize,
    report: ExportReport,
}

impl<'a> Exporter<'a> {
    pub fn new(
        config: &'a ExportConfig,
        client: &'a dyn CatalogClient,
        writer: &'a dyn ArtifactWriter,
    ) -> Self {
        Self {
            config,
            client,
            writer,
            paths: PathDeriver::from_config(config),
            progress_interval: config.progress_interval.max(1),
            report: ExportReport::new(config.run_tag.clone()),
        }
    }

    /// Export the whole catalog.
    ///
    /// Returns `Err` only when the catalog root cannot be fetched or read.
    pub async fn run(mut self) -> Result<ExportReport, ExportError> {
        info!("-- Starting export at {}", Utc::now().to_rfc3339());

        self.visit(Node::Library).await?;

        let r = &self.report;
        info!(
            sections_exported = r.sections_exported,
            sections_skipped = r.sections_skipped,
            sections_failed = r.sections_failed,
            items_exported = r.items_exported,
            items_failed = r.items_failed,
            documents = r.documents_written,
            assets = r.assets_written,
            assets_failed = r.assets_failed,
            write_failures = r.write_failures,
            decode_failures = r.decode_failures,
            "Export finished"
        );

        Ok(self.report)
    }

    /// Dispatch a node to its handler
    fn visit<'s>(&'s mut self, node: Node<'s>) -> BoxFuture<'s, Result<Visit, ExportError>> {
        Box::pin(async move {
            match node {
                Node::Library => self.export_library().await,
                Node::Section(section) => self.export_section(section).await,
                Node::Show(key) => self.export_show(key).await,
                Node::Season(key) => self.export_season(key).await,
                Node::Episode(key) => self.export_episode(key).await,
                Node::Movie(key) => self.export_movie(key).await,
            }
        })
    }

    async fn export_library(&mut self) -> Result<Visit, ExportError> {
        info!("- Fetching library sections");

        let docs = self
            .client
            .fetch_listing(&ListingRef::Root)
            .await
            .map_err(|e| ExportError::Fatal(e.to_string()))?;
        let root = MediaContainer::from_json(&docs.json)
            .map_err(|e| ExportError::Fatal(format!("unreadable root listing: {}", e)))?;

        let title = root.title1.as_deref().unwrap_or("Plex Library");
        info!(
            "Library: {} ({}) with {} sections",
            title,
            root.view_group.as_deref().unwrap_or("-"),
            root.size.unwrap_or(root.directories.len() as u64)
        );

        let target = self.paths.library(title);
        self.write_documents(&target, &docs).await;

        let total = root.directories.len();
        for (idx, section) in root.directories.iter().enumerate() {
            info!(
                "Exporting section {} of {} - {}% of the sections exported",
                idx + 1,
                total,
                progress_percent(idx, total)
            );

            if !self.config.supports(section.kind) {
                info!("skipping {} ({}) unsupported type", section.title, section.kind);
                self.report.sections_skipped += 1;
                continue;
            }

            self.visit(Node::Section(section)).await?;
        }

        Ok(Visit::Done)
    }

    #[instrument(skip(self, section), fields(section = %section.title))]
    async fn export_section(&mut self, section: &LibrarySection) -> Result<Visit, ExportError> {
        let listing = ListingRef::Section(section.key.clone());

        let docs = match self.client.fetch_listing(&listing).await {
            Ok(docs) => docs,
            Err(CatalogError::NoChildren(_)) => {
                info!("Section {} is empty", section.title);
                self.report.sections_exported += 1;
                return Ok(Visit::Done);
            }
            Err(e) => {
                self.fail(ExportError::Section {
                    section: section.title.clone(),
                    reason: e.to_string(),
                });
                return Ok(Visit::Done);
            }
        };

        let container = match MediaContainer::from_json(&docs.json) {
            Ok(container) => container,
            Err(source) => {
                self.fail(ExportError::Decode {
                    what: format!("listing of section '{}'", section.title),
                    source,
                });
                return Ok(Visit::Done);
            }
        };

        info!(
            "Library Section: {} ({} items)",
            section.title,
            container.metadata.len()
        );

        for target in self.paths.section(section) {
            self.write_documents(&target, &docs).await;
        }

        let total = container.metadata.len();
        for (idx, item) in container.metadata.iter().enumerate() {
            let count = idx + 1;
            if count % self.progress_interval == 0 {
                info!(
                    "progress {} of {} - {}%",
                    count,
                    total,
                    progress_percent(idx, total)
                );
            }

            // Items are dispatched by the kind of the section that lists them
            match Node::item(section.kind, &item.rating_key) {
                Some(node) => {
                    self.visit(node).await?;
                }
                None => warn!("Sorry, this media type is unsupported {}.", section.kind),
            }
        }

        self.report.sections_exported += 1;
        Ok(Visit::Done)
    }

    #[instrument(skip(self))]
    async fn export_movie(&mut self, rating_key: &str) -> Result<Visit, ExportError> {
        let Some((docs, container)) = self.fetch_entity(MediaKind::Movie, rating_key).await else {
            return Ok(Visit::Done);
        };

        let mut exported = false;
        for movie in &container.metadata {
            info!("- {} | {}", movie.library_title(), movie.title);

            let targets = self.paths.media_parts(MediaKind::Movie, movie);
            if targets.is_empty() {
                warn!(title = %movie.title, "Movie has no media files, nothing to write");
            }

            for target in &targets {
                self.write_documents(target, &docs).await;
                self.write_assets(target, movie, &MEDIA_ASSETS).await;
                exported = true;
            }
        }

        if exported {
            self.report.items_exported += 1;
        }
        Ok(Visit::Done)
    }

    #[instrument(skip(self))]
    async fn export_show(&mut self, rating_key: &str) -> Result<Visit, ExportError> {
        let Some((docs, container)) = self.fetch_entity(MediaKind::Show, rating_key).await else {
            return Ok(Visit::Done);
        };
        let Some(show) = container.metadata.first() else {
            return Ok(Visit::Done);
        };

        info!("- {} | {}", show.library_title(), show.title);

        let targets = self.paths.show(show);
        if targets.is_empty() {
            warn!(title = %show.title, "Show has no location, skipping show documents");
        }
        for target in &targets {
            self.write_documents(target, &docs).await;
            self.write_assets(target, show, &SHOW_ASSETS).await;
        }
        self.report.items_exported += 1;

        let Some(seasons) = self.fetch_children(MediaKind::Show, show).await else {
            return Ok(Visit::Done);
        };
        for season in &seasons {
            self.visit(Node::Season(&season.rating_key)).await?;
        }

        Ok(Visit::Done)
    }

    #[instrument(skip(self))]
    async fn export_season(&mut self, rating_key: &str) -> Result<Visit, ExportError> {
        let Some((docs, container)) = self.fetch_entity(MediaKind::Season, rating_key).await else {
            return Ok(Visit::Done);
        };

        for season in &container.metadata {
            self.export_season_entry(season, &docs).await?;
        }

        Ok(Visit::Done)
    }

    async fn export_season_entry(&mut self, season: &CatalogItem, docs: &DocumentPair) -> Result<(), ExportError> {
        info!(
            "  - {} | {} - S{:02} - {}",
            season.library_title(),
            season.parent_title.as_deref().unwrap_or("?"),
            season.index.unwrap_or(0),
            season.title
        );

        let Some(episodes) = self.fetch_children(MediaKind::Season, season).await else {
            return Ok(());
        };

        // Season artifacts go next to the last episode in listing order
        let mut last_location = None;
        for episode in &episodes {
            if let Visit::Located(file) = self.visit(Node::Episode(&episode.rating_key)).await? {
                last_location = Some(file);
            }
        }

        match last_location {
            Some(file) => {
                let target = self.paths.season(&season.title, &file);
                self.write_documents(&target, docs).await;
                self.write_assets(&target, season, &SEASON_ASSETS).await;
                self.report.items_exported += 1;
            }
            None => info!(
                "No episode of {} resolved to a file, skipping season documents",
                season.title
            ),
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn export_episode(&mut self, rating_key: &str) -> Result<Visit, ExportError> {
        let Some((docs, container)) = self.fetch_entity(MediaKind::Episode, rating_key).await else {
            return Ok(Visit::Done);
        };
        let Some(episode) = container.metadata.first() else {
            return Ok(Visit::Done);
        };

        info!(
            "   - {} | {} - S{:02}E{:02} - {}",
            episode.library_title(),
            episode.grandparent_title.as_deref().unwrap_or("?"),
            episode.parent_index.unwrap_or(0),
            episode.index.unwrap_or(0),
            episode.title
        );

        for target in &self.paths.media_parts(MediaKind::Episode, episode) {
            self.write_documents(target, &docs).await;
            self.write_assets(target, episode, &MEDIA_ASSETS).await;
        }
        self.report.items_exported += 1;

        let visit = match episode.part_files().next() {
            Some(file) => Visit::Located(file.to_string()),
            None => Visit::Done,
        };
        Ok(visit)
    }

    /// Fetch and parse an entity's metadata. `None` once the failure is recorded.
    async fn fetch_entity(
        &mut self,
        kind: MediaKind,
        rating_key: &str,
    ) -> Option<(DocumentPair, MediaContainer)> {
        let item_error = |reason: String| ExportError::ItemFetch {
            kind,
            rating_key: rating_key.to_string(),
            reason,
        };

        let docs = match self.client.fetch_entity(rating_key).await {
            Ok(docs) => docs,
            Err(e) => {
                self.fail(item_error(e.to_string()));
                return None;
            }
        };

        match MediaContainer::from_json(&docs.json) {
            Ok(container) if !container.metadata.is_empty() => Some((docs, container)),
            Ok(_) => {
                self.fail(item_error("response holds no metadata".to_string()));
                None
            }
            Err(source) => {
                self.fail(ExportError::Decode {
                    what: format!("metadata of {} {}", kind, rating_key),
                    source,
                });
                None
            }
        }
    }

    /// Children of a show or season. `None` when there is nothing to descend into.
    async fn fetch_children(&mut self, kind: MediaKind, parent: &CatalogItem) -> Option<Vec<CatalogItem>> {
        let listing = ListingRef::Children(parent.rating_key.clone());

        let result = match self.client.fetch_listing(&listing).await {
            Ok(docs) => MediaContainer::from_json(&docs.json)
                .map(|c| c.metadata)
                .map_err(|source| ExportError::Decode {
                    what: format!("children of {} {}", kind, parent.rating_key),
                    source,
                }),
            Err(CatalogError::NoChildren(_)) => Ok(Vec::new()),
            Err(e) => Err(ExportError::ItemFetch {
                kind,
                rating_key: parent.rating_key.clone(),
                reason: format!("children unavailable: {}", e),
            }),
        };

        match result {
            Ok(children) if children.is_empty() => {
                info!("{} does not have children: {}", kind, parent.title);
                None
            }
            Ok(children) => Some(children),
            Err(error) => {
                self.fail(error);
                None
            }
        }
    }

    async fn write_documents(&mut self, target: &ExportTarget, docs: &DocumentPair) {
        for (path, body) in [(target.json_path(), &docs.json), (target.xml_path(), &docs.xml)] {
            match self.writer.write(&path, body.as_bytes()).await {
                Ok(()) => {
                    debug!(path = %path.display(), "Wrote document");
                    self.report.documents_written += 1;
                }
                Err(e) => self.fail(ExportError::Io(e)),
            }
        }
    }

    /// Fetch and store every referenced asset. A failing asset only skips itself.
    async fn write_assets(&mut self, target: &ExportTarget, item: &CatalogItem, kinds: &[AssetKind]) {
        for &kind in kinds {
            let Some(reference) = kind.reference(item) else {
                continue;
            };
            let path = target.asset_path(kind);

            let result = match self.client.fetch_asset(reference).await {
                Ok(stream) => self
                    .writer
                    .write_stream(&path, stream)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            match result {
                Ok(bytes) => {
                    debug!(path = %path.display(), bytes, "Wrote asset");
                    self.report.assets_written += 1;
                }
                Err(message) => self.fail(ExportError::Asset {
                    asset: kind,
                    entity: item.title.clone(),
                    message,
                }),
            }
        }
    }

    fn fail(&mut self, error: ExportError) {
        error!("[ERROR] : {}", error);
        self.report.record(&error);
    }
}

/// Share of `done` out of `total`, floored to two decimals
fn progress_percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (done as f64 / total as f64 * 10000.0).floor() / 100.0
}
