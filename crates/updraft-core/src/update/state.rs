//! Update state machine table.
//!
//! Every legal transition lives in [`UpdateState::next`]; the engine never
//! compares states by declaration order. An input that has no row in the
//! table returns `None` and the caller treats the input as a no-op.

use serde::{Deserialize, Serialize};

/// Externally observable position in the update cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateState {
    /// Nothing checked yet, or the previous cycle was aborted.
    #[default]
    Unchecked,
    /// The lightweight version document is being fetched.
    DownloadingVersion,
    /// The version document arrived and is about to be parsed.
    VersionLoaded,
    /// The full remote manifest is being fetched.
    DownloadingManifest,
    /// The remote manifest arrived and is about to be parsed.
    ManifestLoaded,
    /// Local content matches the remote version.
    UpToDate,
    /// A newer remote version exists; `start_update` may be called.
    NeedUpdate,
    /// A download batch is in flight.
    Updating,
    /// The last batch resolved with failures; retry is possible.
    FailToUpdate,
}

/// Inputs that drive the state table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateInput {
    /// The version-document fetch was submitted.
    VersionRequested,
    /// The version document arrived on disk.
    VersionFetched,
    /// The manifest fetch was submitted (fresh check, version fallback,
    /// or `start_update` without a loaded remote manifest).
    ManifestRequested,
    /// The manifest document arrived on disk.
    ManifestFetched,
    /// Manifest fetch or parse failed; the cycle is over.
    CycleAborted,
    /// Version comparison concluded nothing changed.
    FoundUpToDate,
    /// Version comparison found a newer remote version.
    FoundNewVersion,
    /// A download batch was planned and submitted.
    UpdateStarted,
    /// Every unit of the batch resolved and none failed.
    BatchSucceeded,
    /// Every unit of the batch resolved and at least one failed.
    BatchFailed,
}

impl UpdateState {
    /// The transition table: `(state, input) -> next state`.
    ///
    /// Returns `None` when the input is not legal in this state.
    #[must_use]
    pub const fn next(self, input: StateInput) -> Option<Self> {
        use StateInput as In;
        match (self, input) {
            (Self::Unchecked, In::VersionRequested) => Some(Self::DownloadingVersion),
            (Self::DownloadingVersion, In::VersionFetched) => Some(Self::VersionLoaded),
            (
                Self::Unchecked
                | Self::DownloadingVersion
                | Self::VersionLoaded
                | Self::NeedUpdate
                | Self::FailToUpdate,
                In::ManifestRequested,
            ) => Some(Self::DownloadingManifest),
            (Self::DownloadingManifest, In::ManifestFetched) => Some(Self::ManifestLoaded),
            // A failed cycle can be abandoned from any non-terminal,
            // non-updating position (missing URL, fetch error, parse error).
            (
                Self::Unchecked
                | Self::DownloadingVersion
                | Self::VersionLoaded
                | Self::DownloadingManifest
                | Self::ManifestLoaded
                | Self::NeedUpdate
                | Self::FailToUpdate,
                In::CycleAborted,
            ) => Some(Self::Unchecked),
            (Self::VersionLoaded | Self::ManifestLoaded, In::FoundUpToDate) => Some(Self::UpToDate),
            (Self::VersionLoaded | Self::ManifestLoaded, In::FoundNewVersion) => {
                Some(Self::NeedUpdate)
            }
            (Self::NeedUpdate | Self::FailToUpdate, In::UpdateStarted) => Some(Self::Updating),
            (Self::Updating, In::BatchSucceeded) => Some(Self::UpToDate),
            (Self::Updating, In::BatchFailed) => Some(Self::FailToUpdate),
            _ => None,
        }
    }

    /// Whether `check_update` is accepted in this state.
    #[must_use]
    pub const fn can_check(self) -> bool {
        matches!(
            self,
            Self::Unchecked | Self::UpToDate | Self::NeedUpdate | Self::FailToUpdate
        )
    }

    /// Whether `start_update` is accepted in this state.
    #[must_use]
    pub const fn can_start(self) -> bool {
        matches!(self, Self::NeedUpdate | Self::FailToUpdate)
    }

    /// Whether `download_failed_assets` is accepted in this state.
    #[must_use]
    pub const fn can_retry_failed(self) -> bool {
        matches!(self, Self::FailToUpdate)
    }

    /// String representation for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unchecked => "unchecked",
            Self::DownloadingVersion => "downloading_version",
            Self::VersionLoaded => "version_loaded",
            Self::DownloadingManifest => "downloading_manifest",
            Self::ManifestLoaded => "manifest_loaded",
            Self::UpToDate => "up_to_date",
            Self::NeedUpdate => "need_update",
            Self::Updating => "updating",
            Self::FailToUpdate => "fail_to_update",
        }
    }
}
