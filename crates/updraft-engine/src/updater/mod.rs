//! The update state machine.
//!
//! [`AssetsUpdater`] is a thin handle over an actor task that owns every
//! mutable field (manifests, pending units, counters, state). Commands from
//! the handle and completions from the orchestrator drain through the same
//! `select!` loop, so at most one of them mutates state at a time and the
//! caller never blocks.

mod actor;
mod paths;

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use updraft_core::{Fetcher, UpdateError, UpdateEventSink, UpdateResult, UpdateState};

use crate::orchestrator::DownloadOrchestrator;
use actor::UpdaterActor;

pub use paths::{MANIFEST_FILENAME, TEMP_MANIFEST_FILENAME, UpdaterPaths, VERSION_FILENAME};

/// Configuration for creating an [`AssetsUpdater`].
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// The manifest bundled with the installation (read-only baseline).
    pub local_manifest: PathBuf,
    /// Directory downloaded content and the manifest files live in.
    pub storage_dir: PathBuf,
}

impl UpdaterConfig {
    /// Create a new config.
    pub fn new(local_manifest: impl Into<PathBuf>, storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            local_manifest: local_manifest.into(),
            storage_dir: storage_dir.into(),
        }
    }
}

/// Point-in-time status of the updater, answered by the actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterSnapshot {
    /// Current position in the update cycle.
    pub state: UpdateState,
    /// Batch completion percent, 0..=100.
    pub percent: u32,
    /// Units still waiting for an outcome in the running batch.
    pub pending_count: usize,
    /// Units collected into the failed set.
    pub failed_count: usize,
    /// Version of the local baseline manifest (empty when none loaded).
    pub local_version: String,
    /// Version of the remote manifest (empty until fetched).
    pub remote_version: String,
}

/// Commands the handle enqueues for the actor.
pub(crate) enum Command {
    CheckUpdate,
    StartUpdate,
    DownloadFailedAssets,
    Cancel,
    Snapshot(oneshot::Sender<UpdaterSnapshot>),
}

/// Handle to the update engine.
///
/// All operations are fire-and-forget; outcomes arrive on the event sink.
/// Cloning the handle is cheap, and the actor stops once every handle is
/// dropped.
#[derive(Clone)]
pub struct AssetsUpdater {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl AssetsUpdater {
    /// Create the updater and spawn its actor task.
    ///
    /// Reads the bundled/committed/temp manifests from disk during startup;
    /// must be called within a tokio runtime.
    #[must_use]
    pub fn new(
        config: UpdaterConfig,
        fetcher: Arc<dyn Fetcher>,
        events: Arc<dyn UpdateEventSink>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (orchestrator, outcome_rx) = DownloadOrchestrator::new(fetcher);

        tokio::spawn(async move {
            let actor = UpdaterActor::initialize(&config, orchestrator, events);
            actor.run(cmd_rx, outcome_rx).await;
        });

        Self { cmd_tx }
    }

    /// Check whether the remote catalog is newer than the local one.
    ///
    /// From a terminal state this re-emits the corresponding notification
    /// without any network activity.
    pub fn check_update(&self) {
        let _ = self.cmd_tx.send(Command::CheckUpdate);
    }

    /// Begin (or retry) downloading the update. Requires a prior
    /// `check_update` to have reported a new version or a failed cycle.
    pub fn start_update(&self) {
        let _ = self.cmd_tx.send(Command::StartUpdate);
    }

    /// Re-submit exactly the previously failed units as a new batch.
    pub fn download_failed_assets(&self) {
        let _ = self.cmd_tx.send(Command::DownloadFailedAssets);
    }

    /// Cancel every in-flight fetch. Each cancelled unit resolves as a
    /// failed outcome and lands in the failed set, so the batch stays
    /// resumable.
    pub fn cancel(&self) {
        let _ = self.cmd_tx.send(Command::Cancel);
    }

    /// Query current status.
    pub async fn snapshot(&self) -> UpdateResult<UpdaterSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Snapshot(reply_tx))
            .map_err(|_| UpdateError::other("updater stopped"))?;
        reply_rx
            .await
            .map_err(|_| UpdateError::other("updater stopped"))
    }
}
