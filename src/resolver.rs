//! Track metadata resolution

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::song::TrackMetadata;
use crate::types::TrackId;

/// Looks up metadata for a track id.
///
/// Called only from the processing thread. Lookups may be slow; any
/// timeout is the resolver's own business. `Ok(None)` means the track is
/// unknown, which is an expected outcome rather than an error.
pub trait MetadataResolver: Send + Sync {
    fn resolve(&self, track_id: TrackId) -> Result<Option<TrackMetadata>>;
}

/// On-disk catalog format
#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "track")]
    tracks: Vec<TrackMetadata>,
}

/// In-memory resolver backed by a fixed catalog, loadable from TOML:
///
/// ```toml
/// [[track]]
/// id = 100
/// artist = "Artist"
/// title = "Title"
/// album = "Album"
/// duration = 300
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    tracks: HashMap<TrackId, TrackMetadata>,
}

impl StaticCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from a TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml(&contents)?;
        debug!("Loaded {} catalog entries from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    /// Parse a catalog from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(contents)?;
        Ok(file.tracks.into_iter().collect())
    }

    pub fn insert(&mut self, metadata: TrackMetadata) {
        self.tracks.insert(metadata.id, metadata);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl FromIterator<TrackMetadata> for StaticCatalog {
    fn from_iter<I: IntoIterator<Item = TrackMetadata>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for metadata in iter {
            catalog.insert(metadata);
        }
        catalog
    }
}

impl MetadataResolver for StaticCatalog {
    fn resolve(&self, track_id: TrackId) -> Result<Option<TrackMetadata>> {
        Ok(self.tracks.get(&track_id).cloned())
    }
}
