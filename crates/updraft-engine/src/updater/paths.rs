//! Storage layout for the updater.

use std::path::{Path, PathBuf};

/// File name of the cached version document.
pub const VERSION_FILENAME: &str = "version.manifest";

/// File name of the committed manifest (authoritative last-known-good).
pub const MANIFEST_FILENAME: &str = "project.manifest";

/// File name of the in-progress checkpoint manifest.
pub const TEMP_MANIFEST_FILENAME: &str = "project.manifest.temp";

/// Resolved locations of everything the updater writes under its storage
/// directory.
#[derive(Debug, Clone)]
pub struct UpdaterPaths {
    storage_dir: PathBuf,
    cached_version: PathBuf,
    committed_manifest: PathBuf,
    temp_manifest: PathBuf,
}

impl UpdaterPaths {
    /// Resolve the layout under `storage_dir`.
    #[must_use]
    pub fn new(storage_dir: &Path) -> Self {
        Self {
            storage_dir: storage_dir.to_path_buf(),
            cached_version: storage_dir.join(VERSION_FILENAME),
            committed_manifest: storage_dir.join(MANIFEST_FILENAME),
            temp_manifest: storage_dir.join(TEMP_MANIFEST_FILENAME),
        }
    }

    /// Root downloaded assets are stored under.
    #[must_use]
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Where the fetched version document lands.
    #[must_use]
    pub fn cached_version(&self) -> &Path {
        &self.cached_version
    }

    /// The committed manifest file.
    #[must_use]
    pub fn committed_manifest(&self) -> &Path {
        &self.committed_manifest
    }

    /// The temp (checkpoint) manifest file; also where the remote manifest
    /// document is downloaded to before parsing.
    #[must_use]
    pub fn temp_manifest(&self) -> &Path {
        &self.temp_manifest
    }

    /// Destination of one asset.
    #[must_use]
    pub fn asset_path(&self, file_name: &str) -> PathBuf {
        self.storage_dir.join(file_name)
    }
}
