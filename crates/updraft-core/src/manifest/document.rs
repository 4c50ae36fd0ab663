//! The manifest document model.
//!
//! A manifest is a typed structure that serializes itself; the persisted
//! JSON and the in-memory state are the same thing, so updating an asset's
//! download state is a single mutation. Parse operations clear the document
//! before loading and never leave partially committed fields behind.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::update::{DownloadUnit, UpdateError, UpdateResult};

/// Per-asset download progress.
///
/// Persisted as the integer enum of the wire schema; unknown integers
/// deserialize as [`DownloadState::Unstarted`] so a manifest written by a
/// newer engine still resumes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum DownloadState {
    /// Not yet attempted.
    #[default]
    Unstarted = 0,
    /// Submitted to the orchestrator.
    Downloading = 1,
    /// Fetched and on disk.
    Succeeded = 2,
}

impl From<u8> for DownloadState {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Downloading,
            2 => Self::Succeeded,
            _ => Self::Unstarted,
        }
    }
}

impl From<DownloadState> for u8 {
    fn from(state: DownloadState) -> Self {
        state as Self
    }
}

/// One asset in the catalog.
///
/// Owned by the manifest that contains it; mutated only through
/// [`Manifest::set_download_state`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssetRecord {
    /// File name relative to the package root. Not serialized: the manifest
    /// map key is authoritative and is back-filled here after parse.
    #[serde(skip)]
    pub file_name: String,
    /// Content hash of the asset.
    pub md5: String,
    /// Download progress for this asset.
    pub download_state: DownloadState,
}

/// A version/asset-catalog document.
///
/// Three lifecycles exist concurrently in the engine: the *local* baseline,
/// the *remote* catalog fetched from network, and the *temp* checkpoint
/// persisted mid-update for resumption. The type is the same for all three;
/// `loaded` / `version_loaded` record how much of it was populated.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Manifest {
    version: String,
    package_url: String,
    #[serde(rename = "remoteVersionUrl")]
    version_url: String,
    #[serde(rename = "remoteManifestUrl")]
    manifest_url: String,
    engine_version: String,
    assets: HashMap<String, AssetRecord>,
    #[serde(skip)]
    loaded: bool,
    #[serde(skip)]
    version_loaded: bool,
}

impl Manifest {
    /// Create an empty, unloaded manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a complete manifest document from a file.
    ///
    /// Clears the document first; on failure it stays cleared and
    /// `loaded()` reports `false`.
    pub fn parse_full(&mut self, path: &Path) -> UpdateResult<()> {
        self.clear();
        let text = fs::read_to_string(path).map_err(|e| UpdateError::from_io_error(&e))?;
        self.parse_full_text(&text)
    }

    /// Parse a complete manifest document from already-fetched text.
    pub fn parse_full_text(&mut self, text: &str) -> UpdateResult<()> {
        self.clear();
        let mut doc: Self =
            serde_json::from_str(text).map_err(|e| UpdateError::parse(e.to_string()))?;

        // A manifest without a version cannot answer version_equals.
        if doc.version.is_empty() {
            return Err(UpdateError::parse("manifest has no version field"));
        }

        if !doc.package_url.is_empty() && !doc.package_url.ends_with('/') {
            doc.package_url.push('/');
        }

        for (name, asset) in &mut doc.assets {
            asset.file_name.clone_from(name);
        }

        doc.loaded = true;
        doc.version_loaded = true;
        *self = doc;
        Ok(())
    }

    /// Parse only the version metadata from a file (version document).
    ///
    /// Sets `version_loaded()` on success; the asset catalog stays empty and
    /// `loaded()` stays `false`.
    pub fn parse_version_only(&mut self, path: &Path) -> UpdateResult<()> {
        self.clear();
        let text = fs::read_to_string(path).map_err(|e| UpdateError::from_io_error(&e))?;
        self.parse_version_text(&text)
    }

    /// Parse only the version metadata from already-fetched text.
    pub fn parse_version_text(&mut self, text: &str) -> UpdateResult<()> {
        self.clear();
        let doc: Self =
            serde_json::from_str(text).map_err(|e| UpdateError::parse(e.to_string()))?;

        if doc.version.is_empty() {
            return Err(UpdateError::parse("version document has no version field"));
        }

        self.version = doc.version;
        self.version_url = doc.version_url;
        self.manifest_url = doc.manifest_url;
        self.engine_version = doc.engine_version;
        self.version_loaded = true;
        Ok(())
    }

    /// Exact string equality on `version` - the sole "up to date" criterion.
    #[must_use]
    pub fn version_equals(&self, other: &Self) -> bool {
        self.version == other.version
    }

    /// Update one asset's download state. No-op when the file name is
    /// unknown.
    pub fn set_download_state(&mut self, file_name: &str, state: DownloadState) {
        if let Some(asset) = self.assets.get_mut(file_name) {
            asset.download_state = state;
        }
    }

    /// Set every asset's download state at once.
    pub fn set_all_download_states(&mut self, state: DownloadState) {
        for asset in self.assets.values_mut() {
            asset.download_state = state;
        }
    }

    /// One download unit per asset that has not yet succeeded, targeting
    /// `package_url + file_name`. Assets already marked
    /// [`DownloadState::Succeeded`] are skipped, which is what makes a
    /// partial restart resume instead of redownloading.
    #[must_use]
    pub fn gen_resume_units(&self, storage_root: &Path) -> Vec<DownloadUnit> {
        self.assets
            .values()
            .filter(|asset| asset.download_state != DownloadState::Succeeded)
            .map(|asset| {
                DownloadUnit::new(
                    asset.file_name.clone(),
                    format!("{}{}", self.package_url, asset.file_name),
                    storage_root.join(&asset.file_name),
                )
            })
            .collect()
    }

    /// Serialize the current state (including per-asset download progress)
    /// to `path`, atomically: the content is written under a sibling name
    /// and renamed into place.
    pub fn save_to_file(&self, path: &Path) -> UpdateResult<()> {
        let text =
            serde_json::to_string_pretty(self).map_err(|e| UpdateError::parse(e.to_string()))?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UpdateError::other(format!("invalid manifest path {}", path.display())))?;
        let staging = path.with_file_name(format!("{file_name}.writing"));

        fs::write(&staging, text).map_err(|e| UpdateError::from_io_error(&e))?;
        fs::rename(&staging, path).map_err(|e| UpdateError::from_io_error(&e))?;
        Ok(())
    }

    /// Whether the full document (version fields + asset catalog) is loaded.
    #[must_use]
    pub const fn loaded(&self) -> bool {
        self.loaded
    }

    /// Whether at least the version metadata is loaded.
    #[must_use]
    pub const fn version_loaded(&self) -> bool {
        self.version_loaded
    }

    /// The catalog version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Base URL asset downloads are rooted at, normalized to end with `/`.
    #[must_use]
    pub fn package_url(&self) -> &str {
        &self.package_url
    }

    /// Remote URL of the version document.
    #[must_use]
    pub fn version_url(&self) -> &str {
        &self.version_url
    }

    /// Remote URL of the manifest document.
    #[must_use]
    pub fn manifest_url(&self) -> &str {
        &self.manifest_url
    }

    /// Engine version recorded in the document.
    #[must_use]
    pub fn engine_version(&self) -> &str {
        &self.engine_version
    }

    /// The full asset catalog, keyed by file name.
    #[must_use]
    pub const fn assets(&self) -> &HashMap<String, AssetRecord> {
        &self.assets
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}
