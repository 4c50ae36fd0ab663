//! Update events - the typed notification stream consumed by the host.

use serde::{Deserialize, Serialize};

/// Code identifying what an [`UpdateEvent`] reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCode {
    /// No usable local manifest; check/update cannot proceed.
    ErrorNoLocalManifest,
    /// The remote manifest document could not be fetched.
    ErrorDownloadManifest,
    /// The remote manifest document could not be parsed.
    ErrorParseManifest,
    /// The remote version differs from the local one.
    NewVersionFound,
    /// The local installation already matches the remote version.
    AlreadyUpToDate,
    /// Batch progress changed (percent and/or a status message).
    UpdateProgression,
    /// A single asset finished downloading.
    AssetUpdated,
    /// A single asset failed to download.
    ErrorUpdating,
    /// The whole batch completed and the manifest was committed.
    UpdateFinished,
    /// The batch resolved with at least one failed unit.
    UpdateFailed,
}

impl EventCode {
    /// String representation for logs and wire protocols.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ErrorNoLocalManifest => "error_no_local_manifest",
            Self::ErrorDownloadManifest => "error_download_manifest",
            Self::ErrorParseManifest => "error_parse_manifest",
            Self::NewVersionFound => "new_version_found",
            Self::AlreadyUpToDate => "already_up_to_date",
            Self::UpdateProgression => "update_progression",
            Self::AssetUpdated => "asset_updated",
            Self::ErrorUpdating => "error_updating",
            Self::UpdateFinished => "update_finished",
            Self::UpdateFailed => "update_failed",
        }
    }

    /// Whether this code reports a failure of some kind.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(
            self,
            Self::ErrorNoLocalManifest
                | Self::ErrorDownloadManifest
                | Self::ErrorParseManifest
                | Self::ErrorUpdating
                | Self::UpdateFailed
        )
    }
}

/// One notification emitted by the engine.
///
/// Immutable; a fresh instance is created per emission. `percent` always
/// carries the whole-file completion percent of the running batch, even for
/// events that are not progress events, so a consumer can render a progress
/// bar from any event it receives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEvent {
    /// What happened.
    pub code: EventCode,
    /// File name of the asset this event refers to; empty for batch-level
    /// and document-level events.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub asset_id: String,
    /// Batch completion percent, 0..=100.
    pub percent: u32,
    /// Human-readable detail; empty when the code says it all.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl UpdateEvent {
    /// Create a batch-level event with no asset and no message.
    #[must_use]
    pub const fn new(code: EventCode, percent: u32) -> Self {
        Self {
            code,
            asset_id: String::new(),
            percent,
            message: String::new(),
        }
    }

    /// Create an event referring to a single asset.
    pub fn for_asset(code: EventCode, asset_id: impl Into<String>, percent: u32) -> Self {
        Self {
            code,
            asset_id: asset_id.into(),
            percent,
            message: String::new(),
        }
    }

    /// Attach a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}
