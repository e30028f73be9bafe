//! Read-only projections of the remote catalog.
//!
//! The server answers every request with a `MediaContainer` envelope. The
//! root listing carries `Directory` entries (library sections), every other
//! listing and entity lookup carries `Metadata` entries. Only the fields the
//! exporter needs are modelled; everything else stays in the verbatim
//! documents that get written to disk.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a catalog node, as reported in the `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Show,
    Season,
    Episode,

    /// Music, photo and anything else the exporter does not walk
    #[serde(other)]
    Other,
}

impl Default for MediaKind {
    fn default() -> Self {
        Self::Other
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::Movie => "movie",
            MediaKind::Show => "show",
            MediaKind::Season => "season",
            MediaKind::Episode => "episode",
            MediaKind::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "MediaContainer")]
    media_container: MediaContainer,
}

/// Body of every catalog response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaContainer {
    #[serde(default)]
    pub size: Option<u64>,

    /// Container title (library name on the root, section name on listings)
    #[serde(default)]
    pub title1: Option<String>,

    #[serde(default)]
    pub view_group: Option<String>,

    /// Library sections (root listing only)
    #[serde(default, rename = "Directory")]
    pub directories: Vec<LibrarySection>,

    /// Items of a listing, or the entity itself for metadata lookups
    #[serde(default, rename = "Metadata")]
    pub metadata: Vec<CatalogItem>,
}

impl MediaContainer {
    /// Parse the structured (JSON) representation of a response
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Envelope>(json).map(|e| e.media_container)
    }
}

/// A library section from the root listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LibrarySection {
    pub key: String,
    pub title: String,

    #[serde(default, rename = "type")]
    pub kind: MediaKind,

    /// Filesystem roots the section was built from, in declared order
    #[serde(default, rename = "Location")]
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Location {
    pub path: String,
}

/// One node of the catalog tree (show, season, episode or movie)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub rating_key: String,

    #[serde(default)]
    pub title: String,

    #[serde(default, rename = "type")]
    pub kind: MediaKind,

    #[serde(default)]
    pub library_section_title: Option<String>,

    #[serde(default)]
    pub parent_rating_key: Option<String>,
    #[serde(default)]
    pub parent_title: Option<String>,
    #[serde(default)]
    pub parent_index: Option<u32>,

    #[serde(default)]
    pub grandparent_rating_key: Option<String>,
    #[serde(default)]
    pub grandparent_title: Option<String>,

    /// Season number for seasons, episode number for episodes
    #[serde(default)]
    pub index: Option<u32>,

    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub art: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,

    #[serde(default, rename = "Media")]
    pub media: Vec<Media>,

    /// Folder(s) of a show
    #[serde(default, rename = "Location")]
    pub locations: Vec<Location>,
}

impl CatalogItem {
    /// Library title for log lines
    pub fn library_title(&self) -> &str {
        self.library_section_title.as_deref().unwrap_or("?")
    }

    /// File paths of every part of every media version, in listing order
    pub fn part_files(&self) -> impl Iterator<Item = &str> {
        self.media
            .iter()
            .flat_map(|m| m.parts.iter())
            .map(|p| p.file.as_str())
            .filter(|f| !f.is_empty())
    }
}

/// One version (cut, quality) of a movie or episode
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Media {
    #[serde(default, rename = "Part")]
    pub parts: Vec<Part>,
}

/// One file of a media version
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub file: String,
}

/// A node of the catalog tree the exporter can visit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node<'a> {
    Library,
    Section(&'a LibrarySection),
    Show(&'a str),
    Season(&'a str),
    Episode(&'a str),
    Movie(&'a str),
}

impl<'a> Node<'a> {
    /// Node for an item of a section listing of the given kind
    pub fn item(kind: MediaKind, rating_key: &'a str) -> Option<Self> {
        match kind {
            MediaKind::Movie => Some(Node::Movie(rating_key)),
            MediaKind::Show => Some(Node::Show(rating_key)),
            MediaKind::Season => Some(Node::Season(rating_key)),
            MediaKind::Episode => Some(Node::Episode(rating_key)),
            MediaKind::Other => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_root_listing() {
        let json = r#"{
            "MediaContainer": {
                "size": 2,
                "title1": "Plex Library",
                "viewGroup": "secondary",
                "Directory": [
                    {"key": "1", "title": "Movies", "type": "movie",
                     "Location": [{"id": 1, "path": "/data/movies"}]},
                    {"key": "2", "title": "Music", "type": "artist",
                     "Location": [{"id": 2, "path": "/data/music"}]}
                ]
            }
        }"#;

        let container = MediaContainer::from_json(json).unwrap();
        assert_eq!(container.title1.as_deref(), Some("Plex Library"));
        assert_eq!(container.view_group.as_deref(), Some("secondary"));
        assert_eq!(container.directories.len(), 2);
        assert_eq!(container.directories[0].kind, MediaKind::Movie);
        assert_eq!(container.directories[0].locations[0].path, "/data/movies");
        // Unknown kinds collapse to Other
        assert_eq!(container.directories[1].kind, MediaKind::Other);
        assert!(container.metadata.is_empty());
    }

    #[test]
    fn test_parse_episode_metadata() {
        let json = r#"{
            "MediaContainer": {
                "size": 1,
                "Metadata": [{
                    "ratingKey": "42",
                    "type": "episode",
                    "title": "Pilot",
                    "librarySectionTitle": "TV",
                    "grandparentTitle": "Show",
                    "parentIndex": 1,
                    "index": 3,
                    "thumb": "/library/metadata/42/thumb/1",
                    "Media": [
                        {"Part": [{"file": "/tv/Show/S01/e03a.mkv"}, {"file": "/tv/Show/S01/e03b.mkv"}]},
                        {"Part": [{"file": ""}]}
                    ]
                }]
            }
        }"#;

        let container = MediaContainer::from_json(json).unwrap();
        let item = &container.metadata[0];
        assert_eq!(item.rating_key, "42");
        assert_eq!(item.kind, MediaKind::Episode);
        assert_eq!(item.parent_index, Some(1));
        assert_eq!(item.index, Some(3));
        assert_eq!(item.library_title(), "TV");
        assert!(item.art.is_none());

        let files: Vec<_> = item.part_files().collect();
        assert_eq!(files, vec!["/tv/Show/S01/e03a.mkv", "/tv/Show/S01/e03b.mkv"]);
    }

    #[test]
    fn test_missing_envelope_is_an_error() {
        assert!(MediaContainer::from_json(r#"{"size": 1}"#).is_err());
        assert!(MediaContainer::from_json("<MediaContainer/>").is_err());
    }

    #[test]
    fn test_node_for_item_kind() {
        assert_eq!(Node::item(MediaKind::Movie, "1"), Some(Node::Movie("1")));
        assert_eq!(Node::item(MediaKind::Show, "2"), Some(Node::Show("2")));
        assert_eq!(Node::item(MediaKind::Other, "3"), None);
    }
}
