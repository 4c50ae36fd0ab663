//! The updater actor: owns every mutable field and applies commands and
//! fetch completions one at a time.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use updraft_core::{
    DiffKind, DownloadState, DownloadUnit, EventCode, MANIFEST_ID, Manifest, StateInput,
    UpdateError, UpdateEvent, UpdateEventSink, UpdateState, VERSION_ID,
};

use crate::orchestrator::{DownloadOrchestrator, DownloadOutcome};

use super::paths::UpdaterPaths;
use super::{Command, UpdaterConfig, UpdaterSnapshot};

pub(crate) struct UpdaterActor {
    paths: UpdaterPaths,
    orchestrator: DownloadOrchestrator,
    events: Arc<dyn UpdateEventSink>,

    /// Read-only baseline: the bundled manifest, or the committed one when
    /// it is at least as new.
    local: Manifest,
    /// The latest remote catalog; replaced wholesale on every successful
    /// manifest parse, or adopted from `temp` when resuming.
    remote: Manifest,
    /// Checkpoint of a previous unfinished update, if one exists. Kept in
    /// sync with the on-disk temp manifest whenever progress is persisted.
    temp: Manifest,

    /// Units of the running batch still waiting for an outcome.
    download_units: HashMap<String, DownloadUnit>,
    /// Units whose fetch failed in the running (or last) batch.
    failed_units: HashMap<String, DownloadUnit>,

    total_to_download: usize,
    total_wait: usize,
    percent: u32,
    state: UpdateState,
}

impl UpdaterActor {
    /// Build the actor state: resolve paths, ensure the storage directory,
    /// and load the local/committed/temp manifests from disk.
    pub(crate) fn initialize(
        config: &UpdaterConfig,
        orchestrator: DownloadOrchestrator,
        events: Arc<dyn UpdateEventSink>,
    ) -> Self {
        let paths = UpdaterPaths::new(&config.storage_dir);
        if let Err(error) = fs::create_dir_all(paths.storage_dir()) {
            tracing::error!(
                %error,
                dir = %paths.storage_dir().display(),
                "Failed to create storage directory"
            );
        }

        let mut core = Self {
            paths,
            orchestrator,
            events,
            local: Manifest::new(),
            remote: Manifest::new(),
            temp: Manifest::new(),
            download_units: HashMap::new(),
            failed_units: HashMap::new(),
            total_to_download: 0,
            total_wait: 0,
            percent: 0,
            state: UpdateState::Unchecked,
        };
        core.load_local_manifest(&config.local_manifest);
        core.load_temp_manifest();
        core
    }

    /// Drain commands and fetch completions until every handle is dropped.
    pub(crate) async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut outcome_rx: mpsc::UnboundedReceiver<DownloadOutcome>,
    ) {
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    // Every handle dropped: stop. Outstanding fetches resolve
                    // into a closed channel and are discarded.
                    None => break,
                },
                Some(outcome) = outcome_rx.recv() => self.apply_outcome(outcome).await,
            }
        }
        tracing::debug!("Updater actor stopped");
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::CheckUpdate => self.check_update().await,
            Command::StartUpdate => self.start_update().await,
            Command::DownloadFailedAssets => self.download_failed_assets().await,
            Command::Cancel => self.orchestrator.cancel_all().await,
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Manifest initialization
    // ─────────────────────────────────────────────────────────────────────

    fn load_local_manifest(&mut self, bundled_path: &Path) {
        // A committed manifest from a previous update supersedes the bundled
        // one unless a fresh install shipped something newer.
        let mut committed = Manifest::new();
        let committed_path = self.paths.committed_manifest().to_path_buf();
        if committed_path.exists() {
            if let Err(error) = committed.parse_full(&committed_path) {
                tracing::warn!(%error, "Removing unreadable committed manifest");
                let _ = fs::remove_file(&committed_path);
            }
        }

        if let Err(error) = self.local.parse_full(bundled_path) {
            tracing::error!(
                %error,
                path = %bundled_path.display(),
                "No local manifest found"
            );
            return;
        }

        if committed.loaded() {
            if self.local.version() > committed.version() {
                tracing::info!(
                    bundled = self.local.version(),
                    committed = committed.version(),
                    "Bundled manifest is newer than the committed one, clearing storage"
                );
                if let Err(error) = fs::remove_dir_all(self.paths.storage_dir()) {
                    tracing::warn!(%error, "Failed to clear storage directory");
                }
                if let Err(error) = fs::create_dir_all(self.paths.storage_dir()) {
                    tracing::error!(%error, "Failed to recreate storage directory");
                }
            } else {
                self.local = committed;
            }
        }
    }

    fn load_temp_manifest(&mut self) {
        let temp_path = self.paths.temp_manifest().to_path_buf();
        if temp_path.exists() {
            if let Err(error) = self.temp.parse_full(&temp_path) {
                tracing::warn!(%error, "Removing unreadable temp manifest");
                let _ = fs::remove_file(&temp_path);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Public operations
    // ─────────────────────────────────────────────────────────────────────

    async fn check_update(&mut self) {
        if !self.local.loaded() {
            tracing::error!("No local manifest file found");
            self.dispatch(UpdateEvent::new(EventCode::ErrorNoLocalManifest, self.percent));
            return;
        }

        match self.state {
            UpdateState::Unchecked => self.download_version().await,
            UpdateState::UpToDate => {
                self.dispatch(UpdateEvent::new(EventCode::AlreadyUpToDate, self.percent));
            }
            UpdateState::NeedUpdate | UpdateState::FailToUpdate => {
                self.dispatch(UpdateEvent::new(EventCode::NewVersionFound, self.percent));
            }
            _ => {
                tracing::debug!(state = self.state.as_str(), "check_update ignored");
            }
        }
    }

    async fn start_update(&mut self) {
        if !self.local.loaded() {
            tracing::error!("No local manifest file found");
            self.dispatch(UpdateEvent::new(EventCode::ErrorNoLocalManifest, self.percent));
            return;
        }

        if !self.state.can_start() {
            tracing::debug!(state = self.state.as_str(), "start_update ignored");
            return;
        }

        if self.remote.loaded() {
            // Retrying after a failed batch only re-fetches what failed;
            // otherwise derive a full plan.
            if self.state.can_retry_failed() && !self.failed_units.is_empty() {
                self.retry_failed_units().await;
            } else {
                self.do_update().await;
            }
        } else {
            self.request_manifest().await;
        }
    }

    async fn download_failed_assets(&mut self) {
        if !self.state.can_retry_failed() {
            tracing::debug!(state = self.state.as_str(), "download_failed_assets ignored");
            return;
        }
        if self.failed_units.is_empty() {
            tracing::debug!("No failed units to retry");
            return;
        }
        self.retry_failed_units().await;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Version / manifest document steps
    // ─────────────────────────────────────────────────────────────────────

    async fn download_version(&mut self) {
        let version_url = self.local.version_url().to_string();
        if version_url.is_empty() {
            tracing::warn!("No version document URL, step skipped");
            self.request_manifest().await;
            return;
        }

        self.transition(StateInput::VersionRequested);
        let unit = DownloadUnit::new(VERSION_ID, version_url, self.paths.cached_version());
        self.orchestrator.submit(unit).await;
    }

    async fn on_version_fetched(&mut self) {
        if !self.transition(StateInput::VersionFetched) {
            return;
        }

        let path = self.paths.cached_version().to_path_buf();
        if let Err(error) = self.remote.parse_version_only(&path) {
            tracing::warn!(%error, "Failed to parse version document, step skipped");
            self.request_manifest().await;
            return;
        }

        if self.local.version_equals(&self.remote) {
            self.transition(StateInput::FoundUpToDate);
            self.dispatch(UpdateEvent::new(EventCode::AlreadyUpToDate, self.percent));
        } else {
            self.transition(StateInput::FoundNewVersion);
            self.dispatch(UpdateEvent::new(EventCode::NewVersionFound, self.percent));
        }
    }

    async fn on_version_failed(&mut self, error: &UpdateError) {
        tracing::warn!(%error, "Failed to download version document, step skipped");
        self.request_manifest().await;
    }

    /// Submit the manifest-document fetch, preferring the URL from a parsed
    /// version document over the local manifest's.
    async fn request_manifest(&mut self) {
        let manifest_url = if self.remote.version_loaded() {
            self.remote.manifest_url().to_string()
        } else {
            self.local.manifest_url().to_string()
        };

        if manifest_url.is_empty() {
            tracing::error!("No manifest URL, check update failed");
            self.dispatch(UpdateEvent::new(
                EventCode::ErrorDownloadManifest,
                self.percent,
            ));
            self.transition(StateInput::CycleAborted);
            return;
        }

        self.transition(StateInput::ManifestRequested);
        let unit = DownloadUnit::new(MANIFEST_ID, manifest_url, self.paths.temp_manifest());
        self.orchestrator.submit(unit).await;
    }

    async fn on_manifest_fetched(&mut self) {
        if !self.transition(StateInput::ManifestFetched) {
            return;
        }

        // Captured before the parse clears the document.
        let got_version_before = self.remote.version_loaded();

        let path = self.paths.temp_manifest().to_path_buf();
        if let Err(error) = self.remote.parse_full(&path) {
            tracing::error!(%error, "Error parsing manifest file");
            self.dispatch(
                UpdateEvent::new(EventCode::ErrorParseManifest, self.percent)
                    .with_message(error.to_string()),
            );
            self.transition(StateInput::CycleAborted);
            return;
        }

        if self.local.version_equals(&self.remote) {
            self.transition(StateInput::FoundUpToDate);
            if !got_version_before {
                self.dispatch(UpdateEvent::new(EventCode::AlreadyUpToDate, self.percent));
            }
        } else {
            self.transition(StateInput::FoundNewVersion);
            if got_version_before {
                // The host already saw NEW_VERSION_FOUND and asked to update.
                self.do_update().await;
            } else {
                self.dispatch(UpdateEvent::new(EventCode::NewVersionFound, self.percent));
            }
        }
    }

    fn on_manifest_failed(&mut self, error: &UpdateError) {
        tracing::error!(%error, "Failed to download manifest");
        self.dispatch(
            UpdateEvent::new(EventCode::ErrorDownloadManifest, self.percent)
                .with_message(error.to_string()),
        );
        self.transition(StateInput::CycleAborted);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Planning and batch execution
    // ─────────────────────────────────────────────────────────────────────

    async fn do_update(&mut self) {
        if !self.state.can_start() {
            return;
        }
        self.transition(StateInput::UpdateStarted);

        self.download_units.clear();
        self.failed_units.clear();
        self.total_to_download = 0;
        self.total_wait = 0;
        self.percent = 0;

        if self.temp.loaded() && self.temp.version_equals(&self.remote) {
            self.resume_from_temp().await;
        } else {
            self.plan_from_diff().await;
        }
    }

    /// A checkpoint for this exact version exists: adopt it and re-fetch
    /// only its unfinished assets.
    async fn resume_from_temp(&mut self) {
        self.remote = self.temp.clone();

        for unit in self.remote.gen_resume_units(self.paths.storage_dir()) {
            self.download_units.insert(unit.custom_id.clone(), unit);
        }
        self.total_to_download = self.download_units.len();
        self.total_wait = self.total_to_download;

        if self.download_units.is_empty() {
            // Nothing left unfinished; treat as immediate success.
            self.update_succeed();
            return;
        }

        tracing::info!(
            remaining = self.total_to_download,
            version = self.remote.version(),
            "Resuming previous unfinished update"
        );
        let message = format!(
            "Resuming previous unfinished update, {} files remain.",
            self.total_to_download
        );
        self.batch_download().await;
        self.dispatch(
            UpdateEvent::new(EventCode::UpdateProgression, self.percent).with_message(message),
        );
    }

    /// No usable checkpoint: diff local against remote and build the plan.
    async fn plan_from_diff(&mut self) {
        let diffs = self.local.diff(&self.remote);
        if diffs.is_empty() {
            self.update_succeed();
            return;
        }

        let package_url = self.remote.package_url().to_string();
        for (name, diff) in &diffs {
            match diff.kind {
                DiffKind::Deleted => {
                    if !self.delete_removed_asset(name) {
                        return;
                    }
                }
                DiffKind::Added | DiffKind::Modified => {
                    let dest = self.paths.asset_path(name);
                    if let Some(parent) = dest.parent() {
                        if let Err(error) = fs::create_dir_all(parent) {
                            tracing::error!(%error, asset = %name, "Failed to create asset directory");
                            self.abort_batch(name, &UpdateError::from_io_error(&error));
                            return;
                        }
                    }
                    let unit = DownloadUnit::new(name.clone(), format!("{package_url}{name}"), dest);
                    self.download_units.insert(name.clone(), unit);
                }
            }
        }

        // Everything absent from the diff is already in place; record that
        // so a checkpoint save reflects true remaining work.
        let unchanged: Vec<String> = self
            .remote
            .assets()
            .keys()
            .filter(|name| !diffs.contains_key(*name))
            .cloned()
            .collect();
        for name in unchanged {
            self.remote.set_download_state(&name, DownloadState::Succeeded);
        }

        self.total_to_download = self.download_units.len();
        self.total_wait = self.total_to_download;

        if self.download_units.is_empty() {
            // The diff contained deletions only.
            self.update_succeed();
            return;
        }

        tracing::info!(
            total = self.total_to_download,
            version = self.remote.version(),
            "Starting update batch"
        );
        let message = format!(
            "Start to update {} files from remote package.",
            self.total_to_download
        );
        self.batch_download().await;
        self.dispatch(
            UpdateEvent::new(EventCode::UpdateProgression, self.percent).with_message(message),
        );
    }

    /// Delete an asset the remote catalog no longer lists. Returns `false`
    /// when the cycle had to be aborted.
    fn delete_removed_asset(&mut self, name: &str) -> bool {
        let path = self.paths.asset_path(name);
        match fs::remove_file(&path) {
            Ok(()) => true,
            // Already gone: a re-run of an interrupted plan.
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => true,
            Err(error) => {
                tracing::error!(%error, asset = %name, "Failed to delete removed asset");
                self.abort_batch(name, &UpdateError::from_io_error(&error));
                false
            }
        }
    }

    /// Fail the running batch because of a local filesystem error.
    fn abort_batch(&mut self, asset_id: &str, error: &UpdateError) {
        self.dispatch(
            UpdateEvent::for_asset(EventCode::UpdateFailed, asset_id, self.percent)
                .with_message(error.to_string()),
        );
        self.transition(StateInput::BatchFailed);
    }

    async fn retry_failed_units(&mut self) {
        self.transition(StateInput::UpdateStarted);
        self.download_units = std::mem::take(&mut self.failed_units);
        self.total_to_download = self.download_units.len();
        self.total_wait = self.total_to_download;
        tracing::info!(total = self.total_to_download, "Retrying failed units");
        self.batch_download().await;
    }

    async fn batch_download(&mut self) {
        let units: Vec<DownloadUnit> = self.download_units.values().cloned().collect();
        for unit in units {
            self.remote
                .set_download_state(&unit.custom_id, DownloadState::Downloading);
            self.orchestrator.submit(unit).await;
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Completion handling
    // ─────────────────────────────────────────────────────────────────────

    async fn apply_outcome(&mut self, outcome: DownloadOutcome) {
        let DownloadOutcome { unit, result } = outcome;
        match result {
            Ok(()) => self.on_fetch_succeeded(&unit).await,
            Err(error) => self.on_fetch_failed(unit, &error).await,
        }
    }

    async fn on_fetch_succeeded(&mut self, unit: &DownloadUnit) {
        let id = unit.custom_id.as_str();

        if id == VERSION_ID {
            self.on_version_fetched().await;
            return;
        }
        if id == MANIFEST_ID {
            self.on_manifest_fetched().await;
            return;
        }

        self.remote.set_download_state(id, DownloadState::Succeeded);

        let known = self.download_units.remove(id).is_some();
        if known {
            self.total_wait -= 1;
            if self.total_to_download > 0 {
                // Whole-file percent; always within 0..=100.
                #[allow(clippy::cast_possible_truncation)]
                {
                    self.percent = (100 * (self.total_to_download - self.total_wait)
                        / self.total_to_download) as u32;
                }
            }
            self.dispatch(UpdateEvent::new(EventCode::UpdateProgression, self.percent));
        }
        self.dispatch(UpdateEvent::for_asset(EventCode::AssetUpdated, id, self.percent));

        if known && self.total_wait == 0 {
            self.on_units_finished();
        }
    }

    async fn on_fetch_failed(&mut self, unit: DownloadUnit, error: &UpdateError) {
        let id = unit.custom_id.clone();

        if id == VERSION_ID {
            if self.state == UpdateState::DownloadingVersion {
                self.on_version_failed(error).await;
            }
            return;
        }
        if id == MANIFEST_ID {
            if self.state == UpdateState::DownloadingManifest {
                self.on_manifest_failed(error);
            }
            return;
        }

        tracing::warn!(id = %id, %error, "Asset fetch failed");

        let known = self.download_units.remove(&id).is_some();
        if known {
            self.total_wait -= 1;
            self.failed_units.insert(id.clone(), unit);
        }
        self.dispatch(
            UpdateEvent::for_asset(EventCode::ErrorUpdating, id, self.percent)
                .with_message(error.to_string()),
        );

        if known && self.total_wait == 0 {
            self.on_units_finished();
        }
    }

    /// Every unit of the batch has resolved.
    fn on_units_finished(&mut self) {
        if self.failed_units.is_empty() {
            self.update_succeed();
        } else {
            // Checkpoint progress so a restart resumes instead of starting
            // over.
            if let Err(error) = self.remote.save_to_file(self.paths.temp_manifest()) {
                tracing::error!(%error, "Failed to persist temp manifest");
            }
            self.temp = self.remote.clone();

            self.transition(StateInput::BatchFailed);
            self.dispatch(UpdateEvent::new(EventCode::UpdateFailed, self.percent));
        }
    }

    /// Commit the remote manifest as the new last-known-good state.
    fn update_succeed(&mut self) {
        // The committed manifest must read as fully complete.
        self.remote.set_all_download_states(DownloadState::Succeeded);

        if let Err(error) = self.remote.save_to_file(self.paths.committed_manifest()) {
            tracing::error!(%error, "Failed to commit manifest");
            self.dispatch(
                UpdateEvent::new(EventCode::UpdateFailed, self.percent)
                    .with_message(error.to_string()),
            );
            self.transition(StateInput::BatchFailed);
            return;
        }

        // The checkpoint is superseded by the commit.
        let temp_path = self.paths.temp_manifest().to_path_buf();
        if temp_path.exists() {
            if let Err(error) = fs::remove_file(&temp_path) {
                tracing::warn!(%error, "Failed to remove temp manifest");
            }
        }
        self.temp = Manifest::new();

        self.transition(StateInput::BatchSucceeded);
        self.dispatch(UpdateEvent::new(EventCode::UpdateFinished, self.percent));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────

    /// Apply one input to the state table. Returns `false` (and leaves the
    /// state untouched) when the input has no row for the current state,
    /// which is how stale completions are ignored.
    fn transition(&mut self, input: StateInput) -> bool {
        match self.state.next(input) {
            Some(next) => {
                tracing::debug!(
                    from = self.state.as_str(),
                    to = next.as_str(),
                    ?input,
                    "State transition"
                );
                self.state = next;
                true
            }
            None => {
                tracing::warn!(state = self.state.as_str(), ?input, "Ignoring state input");
                false
            }
        }
    }

    fn dispatch(&self, event: UpdateEvent) {
        tracing::debug!(
            code = event.code.as_str(),
            asset = %event.asset_id,
            percent = event.percent,
            "Dispatching update event"
        );
        self.events.emit(event);
    }

    fn snapshot(&self) -> UpdaterSnapshot {
        UpdaterSnapshot {
            state: self.state,
            percent: self.percent,
            pending_count: self.total_wait,
            failed_count: self.failed_units.len(),
            local_version: self.local.version().to_string(),
            remote_version: self.remote.version().to_string(),
        }
    }
}
