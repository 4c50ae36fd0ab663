//! Shared test rig: a scripted in-memory fetcher, manifest fixtures and
//! event-stream helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::timeout;

use updraft_core::{ChannelEventSink, EventCode, Fetcher, UpdateError, UpdateEvent, UpdateResult};
use updraft_engine::{AssetsUpdater, UpdaterConfig};

/// Base URL assets download from in fixtures.
pub const PKG_URL: &str = "http://cdn.test/pkg/";
/// Remote manifest document URL in fixtures.
pub const MANIFEST_URL: &str = "http://cdn.test/project.manifest";
/// Remote version document URL in fixtures.
pub const VERSION_URL: &str = "http://cdn.test/version.manifest";

/// What a scripted URL does when fetched.
#[derive(Clone)]
pub enum Script {
    /// Write the content to the destination and succeed.
    Ok(String),
    /// Fail with the given error.
    Fail(UpdateError),
    /// Never resolve on its own; only cancellation ends it.
    Hang,
}

/// In-memory fetcher with per-URL scripted outcomes and a fetch log.
///
/// Scripts can be swapped at any time, which is how retry tests flip a URL
/// from failing to succeeding between batches.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Script>>,
    log: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(&self, url: &str, content: &str) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), Script::Ok(content.to_string()));
    }

    pub fn fail(&self, url: &str, error: UpdateError) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), Script::Fail(error));
    }

    pub fn hang(&self, url: &str) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), Script::Hang);
    }

    /// Every URL fetched so far, in submission-arrival order.
    pub fn fetch_log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn fetches_of(&self, url: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> UpdateResult<()> {
        self.log.lock().unwrap().push(url.to_string());
        let script = self.scripts.lock().unwrap().get(url).cloned();
        match script {
            Some(Script::Ok(content)) => {
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| UpdateError::from_io_error(&e))?;
                }
                std::fs::write(dest, content).map_err(|e| UpdateError::from_io_error(&e))
            }
            Some(Script::Fail(error)) => Err(error),
            Some(Script::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(UpdateError::other("hang script was not cancelled"))
            }
            None => Err(UpdateError::network(format!("no script for {url}"))),
        }
    }
}

/// Build a full manifest document with the standard fixture URLs.
pub fn manifest_json(version: &str, assets: &[(&str, &str)]) -> String {
    let assets_json: Vec<String> = assets
        .iter()
        .map(|(name, md5)| format!("\"{name}\": {{ \"md5\": \"{md5}\" }}"))
        .collect();
    format!(
        r#"{{
            "version": "{version}",
            "packageUrl": "{PKG_URL}",
            "remoteManifestUrl": "{MANIFEST_URL}",
            "remoteVersionUrl": "{VERSION_URL}",
            "engineVersion": "1.0",
            "assets": {{ {} }}
        }}"#,
        assets_json.join(", ")
    )
}

/// Build a version document.
pub fn version_json(version: &str) -> String {
    format!(
        r#"{{
            "version": "{version}",
            "remoteManifestUrl": "{MANIFEST_URL}",
            "remoteVersionUrl": "{VERSION_URL}"
        }}"#
    )
}

/// URL of one fixture asset.
pub fn asset_url(name: &str) -> String {
    format!("{PKG_URL}{name}")
}

/// Write the bundled manifest the updater is configured with.
pub fn write_bundled_manifest(root: &Path, json: &str) {
    let path = root.join("bundled/project.manifest");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, json).unwrap();
}

/// Spawn an updater over `root/bundled/project.manifest` and `root/storage`,
/// returning the handle and the event stream.
pub fn start_updater(
    root: &Path,
    fetcher: Arc<ScriptedFetcher>,
) -> (AssetsUpdater, mpsc::UnboundedReceiver<UpdateEvent>) {
    let (sink, events) = ChannelEventSink::new();
    let config = UpdaterConfig::new(root.join("bundled/project.manifest"), root.join("storage"));
    let updater = AssetsUpdater::new(config, fetcher, Arc::new(sink));
    (updater, events)
}

/// Receive the next event or panic after five seconds.
pub async fn next_event(events: &mut mpsc::UnboundedReceiver<UpdateEvent>) -> UpdateEvent {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for update event")
        .expect("event channel closed")
}

/// Collect events up to and including the first one with `code`.
pub async fn wait_for(
    events: &mut mpsc::UnboundedReceiver<UpdateEvent>,
    code: EventCode,
) -> Vec<UpdateEvent> {
    let mut seen = Vec::new();
    loop {
        let event = next_event(events).await;
        let done = event.code == code;
        seen.push(event);
        if done {
            return seen;
        }
    }
}

/// Count events in a collected slice with the given code.
pub fn count_code(events: &[UpdateEvent], code: EventCode) -> usize {
    events.iter().filter(|e| e.code == code).count()
}
