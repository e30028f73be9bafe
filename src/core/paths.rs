//! Destination paths for exported artifacts.
//!
//! Every path is a pure function of catalog data, the export root and the
//! run tag. Library paths reported by the server are absolute, so they are
//! appended to the export root as strings rather than joined.
//!
//! | Node    | Directory                              | Base name                               |
//! |---------|----------------------------------------|-----------------------------------------|
//! | Library | export root                            | `{title}-plex-library-{tag}`            |
//! | Section | root + each section location           | `{title}-plex-section-{tag}`            |
//! | Show    | root + each show location              | `{title}-plex-show-item-{tag}`          |
//! | Season  | root + folder of last episode's file   | `{title}-plex-season-item-{tag}`        |
//! | Episode | root + folder of each part's file      | `{file stem}-plex-show-item-{tag}`      |
//! | Movie   | root + folder of each part's file      | `{file stem}-plex-movie-item-{tag}`     |

use std::path::PathBuf;

use crate::config::ExportConfig;
use crate::domain::{CatalogItem, ExportTarget, LibrarySection, MediaKind};

/// Derives [`ExportTarget`]s for catalog nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathDeriver {
    root: String,
    tag: String,
}

impl PathDeriver {
    pub fn new(root: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            root: root.into().trim_end_matches('/').to_string(),
            tag: tag.into(),
        }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(config.export_root.clone(), config.run_tag.clone())
    }

    /// A server-side absolute path relocated under the export root
    fn rooted(&self, path: &str) -> PathBuf {
        PathBuf::from(format!("{}{}", self.root, path))
    }

    pub fn library(&self, title: &str) -> ExportTarget {
        let directory = if self.root.is_empty() {
            PathBuf::from("/")
        } else {
            PathBuf::from(&self.root)
        };
        ExportTarget::new(directory, format!("{}-plex-library-{}", title, self.tag))
    }

    /// One target per declared location of the section
    pub fn section(&self, section: &LibrarySection) -> Vec<ExportTarget> {
        let base_name = format!("{}-plex-section-{}", section.title, self.tag);
        section
            .locations
            .iter()
            .map(|location| ExportTarget::new(self.rooted(&location.path), base_name.clone()))
            .collect()
    }

    /// One target per folder of the show
    pub fn show(&self, show: &CatalogItem) -> Vec<ExportTarget> {
        let base_name = format!("{}-plex-show-item-{}", show.title, self.tag);
        show.locations
            .iter()
            .map(|location| ExportTarget::new(self.rooted(&location.path), base_name.clone()))
            .collect()
    }

    /// Target for a season, colocated with `last_episode_file`
    pub fn season(&self, season_title: &str, last_episode_file: &str) -> ExportTarget {
        let (folder, _) = split_file_name(last_episode_file);
        ExportTarget::new(
            self.rooted(folder),
            format!("{}-plex-season-item-{}", season_title, self.tag),
        )
    }

    /// One target per media part of an episode or movie, in listing order
    pub fn media_parts(&self, kind: MediaKind, item: &CatalogItem) -> Vec<ExportTarget> {
        let label = match kind {
            MediaKind::Movie => "movie",
            _ => "show",
        };

        item.part_files()
            .map(|file| {
                let (folder, stem) = split_file_name(strip_extension(file));
                ExportTarget::new(
                    self.rooted(folder),
                    format!("{}-plex-{}-item-{}", stem, label, self.tag),
                )
            })
            .collect()
    }
}

/// Drop the extension of the last path component, if it has one
fn strip_extension(file: &str) -> &str {
    let name_start = file.rfind('/').map_or(0, |i| i + 1);
    match file[name_start..].rfind('.') {
        Some(dot) if name_start + dot + 1 < file.len() => &file[..name_start + dot],
        _ => file,
    }
}

/// Split into (folder, file name) at the last separator
fn split_file_name(file: &str) -> (&str, &str) {
    match file.rfind('/') {
        Some(i) => (&file[..i], &file[i + 1..]),
        None => ("", file),
    }
}
