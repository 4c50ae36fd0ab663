//! Download unit value type and reserved unit ids.

use std::path::PathBuf;

/// Reserved unit id for the version-document fetch.
pub const VERSION_ID: &str = "@version";

/// Reserved unit id for the manifest-document fetch.
pub const MANIFEST_ID: &str = "@manifest";

/// One (source URL, destination path, id) tuple submitted to the
/// orchestrator.
///
/// A value type with no ownership implications; the orchestrator consumes it
/// once and hands it back inside the completion outcome. `custom_id` is the
/// asset file name, or one of the reserved `@`-prefixed ids for the version
/// and manifest documents themselves (asset file names come from manifest
/// keys, which never start with `@`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadUnit {
    /// Identifier the completion is matched back by.
    pub custom_id: String,
    /// Absolute URL to fetch.
    pub source_url: String,
    /// Local file the fetch writes to.
    pub storage_path: PathBuf,
}

impl DownloadUnit {
    /// Create a new download unit.
    pub fn new(
        custom_id: impl Into<String>,
        source_url: impl Into<String>,
        storage_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            custom_id: custom_id.into(),
            source_url: source_url.into(),
            storage_path: storage_path.into(),
        }
    }

    /// Whether this unit is one of the reserved document fetches rather
    /// than an asset.
    #[must_use]
    pub fn is_document(&self) -> bool {
        self.custom_id == VERSION_ID || self.custom_id == MANIFEST_ID
    }
}
