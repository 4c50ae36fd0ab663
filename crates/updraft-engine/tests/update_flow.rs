//! End-to-end flows: check, full update, fallback and failure handling.

mod support;

use std::sync::Arc;

use support::{
    MANIFEST_URL, VERSION_URL, ScriptedFetcher, asset_url, count_code, manifest_json, next_event,
    start_updater, version_json, wait_for, write_bundled_manifest,
};
use updraft_core::{DownloadState, EventCode, Manifest, UpdateError, UpdateState};

#[tokio::test]
async fn test_same_version_reports_already_up_to_date() {
    let dir = tempfile::tempdir().unwrap();
    write_bundled_manifest(dir.path(), &manifest_json("1.0", &[("a.png", "x")]));

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.ok(VERSION_URL, &version_json("1.0"));

    let (updater, mut events) = start_updater(dir.path(), fetcher.clone());
    updater.check_update();

    let event = next_event(&mut events).await;
    assert_eq!(event.code, EventCode::AlreadyUpToDate);
    assert_eq!(fetcher.fetch_count(), 1);

    let snapshot = updater.snapshot().await.unwrap();
    assert_eq!(snapshot.state, UpdateState::UpToDate);
    assert_eq!(snapshot.local_version, "1.0");
}

#[tokio::test]
async fn test_recheck_from_terminal_state_does_no_network() {
    let dir = tempfile::tempdir().unwrap();
    write_bundled_manifest(dir.path(), &manifest_json("1.0", &[]));

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.ok(VERSION_URL, &version_json("1.0"));

    let (updater, mut events) = start_updater(dir.path(), fetcher.clone());

    updater.check_update();
    assert_eq!(next_event(&mut events).await.code, EventCode::AlreadyUpToDate);

    // Second check re-emits the notification without a new submission.
    updater.check_update();
    assert_eq!(next_event(&mut events).await.code, EventCode::AlreadyUpToDate);
    assert_eq!(fetcher.fetch_count(), 1);
}

#[tokio::test]
async fn test_full_update_downloads_only_the_diff() {
    let dir = tempfile::tempdir().unwrap();
    write_bundled_manifest(dir.path(), &manifest_json("1.0", &[("a.png", "x")]));

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.ok(VERSION_URL, &version_json("1.1"));
    fetcher.ok(
        MANIFEST_URL,
        &manifest_json("1.1", &[("a.png", "y"), ("b.png", "z")]),
    );
    fetcher.ok(&asset_url("a.png"), "A-NEW");
    fetcher.ok(&asset_url("b.png"), "B-NEW");

    let (updater, mut events) = start_updater(dir.path(), fetcher.clone());

    updater.check_update();
    assert_eq!(next_event(&mut events).await.code, EventCode::NewVersionFound);

    updater.start_update();
    let seen = wait_for(&mut events, EventCode::UpdateFinished).await;

    // a.png is MODIFIED, b.png is ADDED: exactly two assets fetched.
    assert_eq!(count_code(&seen, EventCode::AssetUpdated), 2);
    assert_eq!(count_code(&seen, EventCode::ErrorUpdating), 0);
    assert_eq!(fetcher.fetches_of(&asset_url("a.png")), 1);
    assert_eq!(fetcher.fetches_of(&asset_url("b.png")), 1);

    let start_message = seen
        .iter()
        .find(|e| e.code == EventCode::UpdateProgression && !e.message.is_empty())
        .expect("batch start progression event");
    assert_eq!(start_message.message, "Start to update 2 files from remote package.");

    let finished = seen.last().unwrap();
    assert_eq!(finished.percent, 100);

    // Downloaded content landed in the storage directory.
    let storage = dir.path().join("storage");
    assert_eq!(std::fs::read_to_string(storage.join("a.png")).unwrap(), "A-NEW");
    assert_eq!(std::fs::read_to_string(storage.join("b.png")).unwrap(), "B-NEW");

    // The committed manifest is the remote catalog with everything succeeded.
    let mut committed = Manifest::new();
    committed
        .parse_full(&storage.join("project.manifest"))
        .unwrap();
    assert_eq!(committed.version(), "1.1");
    assert_eq!(committed.assets().len(), 2);
    for asset in committed.assets().values() {
        assert_eq!(asset.download_state, DownloadState::Succeeded);
    }
    assert!(!storage.join("project.manifest.temp").exists());

    let snapshot = updater.snapshot().await.unwrap();
    assert_eq!(snapshot.state, UpdateState::UpToDate);
}

#[tokio::test]
async fn test_version_fetch_failure_falls_back_to_manifest() {
    let dir = tempfile::tempdir().unwrap();
    write_bundled_manifest(dir.path(), &manifest_json("1.0", &[("a.png", "x")]));

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.fail(VERSION_URL, UpdateError::network("cdn is down"));
    fetcher.ok(MANIFEST_URL, &manifest_json("1.1", &[("a.png", "y")]));
    fetcher.ok(&asset_url("a.png"), "A-NEW");

    let (updater, mut events) = start_updater(dir.path(), fetcher.clone());

    // The failed version fetch degrades to the manifest fetch; the check
    // still answers.
    updater.check_update();
    assert_eq!(next_event(&mut events).await.code, EventCode::NewVersionFound);
    assert_eq!(fetcher.fetches_of(VERSION_URL), 1);
    assert_eq!(fetcher.fetches_of(MANIFEST_URL), 1);

    // The manifest is already held, so starting does not re-fetch it.
    updater.start_update();
    wait_for(&mut events, EventCode::UpdateFinished).await;
    assert_eq!(fetcher.fetches_of(MANIFEST_URL), 1);
}

#[tokio::test]
async fn test_missing_version_url_goes_straight_to_manifest() {
    let dir = tempfile::tempdir().unwrap();
    // Bundled manifest carries no remoteVersionUrl at all.
    let bundled = format!(
        r#"{{
            "version": "1.0",
            "remoteManifestUrl": "{MANIFEST_URL}",
            "assets": {{ "a.png": {{ "md5": "x" }} }}
        }}"#
    );
    write_bundled_manifest(dir.path(), &bundled);

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.ok(MANIFEST_URL, &manifest_json("1.1", &[("a.png", "y")]));

    let (updater, mut events) = start_updater(dir.path(), fetcher.clone());
    updater.check_update();

    assert_eq!(next_event(&mut events).await.code, EventCode::NewVersionFound);
    assert_eq!(fetcher.fetches_of(VERSION_URL), 0);
    assert_eq!(fetcher.fetches_of(MANIFEST_URL), 1);
}

#[tokio::test]
async fn test_check_without_local_manifest_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    // No bundled manifest written.

    let fetcher = Arc::new(ScriptedFetcher::new());
    let (updater, mut events) = start_updater(dir.path(), fetcher.clone());

    updater.check_update();
    assert_eq!(
        next_event(&mut events).await.code,
        EventCode::ErrorNoLocalManifest
    );
    assert_eq!(fetcher.fetch_count(), 0);

    let snapshot = updater.snapshot().await.unwrap();
    assert_eq!(snapshot.state, UpdateState::Unchecked);
}

#[tokio::test]
async fn test_manifest_fetch_failure_resets_the_cycle() {
    let dir = tempfile::tempdir().unwrap();
    write_bundled_manifest(dir.path(), &manifest_json("1.0", &[("a.png", "x")]));

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.fail(VERSION_URL, UpdateError::network("cdn is down"));
    fetcher.fail(MANIFEST_URL, UpdateError::network_with_status("gone", 502));

    let (updater, mut events) = start_updater(dir.path(), fetcher.clone());
    updater.check_update();

    let event = next_event(&mut events).await;
    assert_eq!(event.code, EventCode::ErrorDownloadManifest);
    assert!(event.message.contains("gone"));

    let snapshot = updater.snapshot().await.unwrap();
    assert_eq!(snapshot.state, UpdateState::Unchecked);

    // The cycle can be started over once the remote recovers.
    fetcher.ok(VERSION_URL, &version_json("1.1"));
    updater.check_update();
    assert_eq!(next_event(&mut events).await.code, EventCode::NewVersionFound);
}

#[tokio::test]
async fn test_manifest_parse_failure_resets_the_cycle() {
    let dir = tempfile::tempdir().unwrap();
    write_bundled_manifest(dir.path(), &manifest_json("1.0", &[("a.png", "x")]));

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.fail(VERSION_URL, UpdateError::network("cdn is down"));
    fetcher.ok(MANIFEST_URL, "{ this is not json");

    let (updater, mut events) = start_updater(dir.path(), fetcher.clone());
    updater.check_update();

    assert_eq!(
        next_event(&mut events).await.code,
        EventCode::ErrorParseManifest
    );
    let snapshot = updater.snapshot().await.unwrap();
    assert_eq!(snapshot.state, UpdateState::Unchecked);
}

#[tokio::test]
async fn test_equal_assets_with_new_version_is_immediate_success() {
    let dir = tempfile::tempdir().unwrap();
    write_bundled_manifest(dir.path(), &manifest_json("1.0", &[("a.png", "x")]));

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.ok(VERSION_URL, &version_json("1.1"));
    // Version bumped, but every asset hash is unchanged: empty diff.
    fetcher.ok(MANIFEST_URL, &manifest_json("1.1", &[("a.png", "x")]));

    let (updater, mut events) = start_updater(dir.path(), fetcher.clone());

    updater.check_update();
    assert_eq!(next_event(&mut events).await.code, EventCode::NewVersionFound);

    updater.start_update();
    let seen = wait_for(&mut events, EventCode::UpdateFinished).await;

    // Nothing to download, no asset traffic, still a committed manifest.
    assert_eq!(count_code(&seen, EventCode::AssetUpdated), 0);
    assert_eq!(fetcher.fetches_of(&asset_url("a.png")), 0);

    let mut committed = Manifest::new();
    committed
        .parse_full(&dir.path().join("storage/project.manifest"))
        .unwrap();
    assert_eq!(committed.version(), "1.1");
}
