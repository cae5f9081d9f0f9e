//! End-to-end update flow against a local stub update server.

mod common;

use common::{StubResponse, StubServer, build_install_tree, build_zip_package, sha256_hex};
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use patchkit::config::UpdaterConfig;
use patchkit::core::UpdaterError;
use patchkit::delta::{DeltaOp, DeltaSet, delta_hash};
use patchkit::progress::ProgressEvent;
use patchkit::updater::{UpdateStatus, Updater};

const PAK_V3: &[u8] = b"pak contents as shipped in version three";
const PAK_V4: &[u8] = b"pak contents after the version four update";
const INI: &[u8] = b"[video]\nvsync=1\n";

fn version_map_json() -> String {
    serde_json::json!({
        "001": {"version": "001"},
        "002": {"version": "002"},
        "003": {"version": "003"},
        "004": {"version": "004", "name": "Content Update 4"},
    })
    .to_string()
}

async fn drain(mut rx: mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

/// Versions 001-003 installed, the remote manifest differs by one modified
/// file, and the cycle ends with 004 as latest.
#[tokio::test]
async fn update_cycle_creates_new_version() {
    let temp = tempdir().unwrap();
    build_install_tree(
        temp.path(),
        &["001", "002", "003"],
        &[("game.pak", PAK_V3), ("config/settings.ini", INI)],
    );

    // The remote manifest says game.pak changed; settings.ini did not.
    let manifest = serde_json::json!({
        "game.pak": sha256_hex(PAK_V4),
        "config/settings.ini": sha256_hex(INI),
    })
    .to_string();

    let mut expected_delta = DeltaSet::new();
    expected_delta.insert("game.pak".into(), DeltaOp::Modified);
    let expected_hash = delta_hash(&expected_delta);

    let server = StubServer::start().await;
    let base = server.url();
    server.route("/update/versionmap", StubResponse::Json(version_map_json()));
    server.route(
        "/update/check",
        StubResponse::Json(r#"{"update_available": true, "latest_version": "004"}"#.into()),
    );
    server.route("/update/hashes/latest", StubResponse::Json(manifest));
    server.route(
        format!("/update/package/{expected_hash}"),
        StubResponse::Json(format!(r#"{{"update_url": "{base}/package.zip"}}"#)),
    );
    server.route(
        "/package.zip",
        StubResponse::Bytes("application/zip", build_zip_package(&[("game.pak", PAK_V4)])),
    );

    let config = UpdaterConfig::new(temp.path(), &base);
    let updater = Updater::new(config).await.unwrap();

    let check = updater.check_for_update().await.unwrap();
    assert!(check.update_available);
    assert_eq!(check.latest_version, "004");

    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let status = updater.update(&cancel, tx).await.unwrap();

    let UpdateStatus::Updated(version) = status else {
        panic!("expected an update to be applied");
    };
    assert_eq!(version.version, "004");

    // The clone got the patched pak and kept the untouched ini.
    let new_dir = temp.path().join("004");
    assert_eq!(std::fs::read(new_dir.join("game.pak")).unwrap(), PAK_V4);
    assert_eq!(std::fs::read(new_dir.join("config/settings.ini")).unwrap(), INI);

    // The source of the clone is intact.
    assert_eq!(std::fs::read(temp.path().join("003/game.pak")).unwrap(), PAK_V3);

    // Retention (keep 2): 001 and 002 are pruned, 003 and 004 remain.
    assert!(!temp.path().join("001").exists());
    assert!(!temp.path().join("002").exists());
    assert!(temp.path().join("003").exists());

    // The staged package file is cleaned up after a successful apply.
    assert!(!temp.path().join(format!("update-{expected_hash}.zip")).exists());

    // Hashing produced one terminal event per file plus the download's
    // completion; no error events anywhere.
    let events = drain(rx).await;
    let terminal = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminal, 3);
    assert!(events.iter().all(|e| e.error.is_none()));
}

/// When local content already matches the remote manifest the cycle stops
/// at the delta stage without touching the install tree.
#[tokio::test]
async fn empty_delta_short_circuits_to_up_to_date() {
    let temp = tempdir().unwrap();
    build_install_tree(temp.path(), &["003"], &[("game.pak", PAK_V3)]);

    let manifest = serde_json::json!({ "game.pak": sha256_hex(PAK_V3) }).to_string();

    let server = StubServer::start().await;
    server.route("/update/versionmap", StubResponse::Json(version_map_json()));
    server.route(
        "/update/check",
        StubResponse::Json(r#"{"update_available": true, "latest_version": "004"}"#.into()),
    );
    server.route("/update/hashes/latest", StubResponse::Json(manifest));

    let updater = Updater::new(UpdaterConfig::new(temp.path(), server.url())).await.unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let status = updater.update(&CancellationToken::new(), tx).await.unwrap();
    assert!(matches!(status, UpdateStatus::UpToDate));
    assert!(!temp.path().join("004").exists());
    drop(rx);
}

#[tokio::test]
async fn server_reporting_no_update_skips_hashing() {
    let temp = tempdir().unwrap();
    build_install_tree(temp.path(), &["003"], &[("game.pak", PAK_V3)]);

    let server = StubServer::start().await;
    server.route("/update/versionmap", StubResponse::Json(version_map_json()));
    server.route(
        "/update/check",
        StubResponse::Json(r#"{"update_available": false, "latest_version": "003"}"#.into()),
    );

    let updater = Updater::new(UpdaterConfig::new(temp.path(), server.url())).await.unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let status = updater.update(&CancellationToken::new(), tx).await.unwrap();

    assert!(matches!(status, UpdateStatus::UpToDate));
    let events = drain(rx).await;
    assert!(events.is_empty());
}

/// Cancelling mid-transfer yields a cancellation error, no completion
/// event, and no partial output file left behind.
#[tokio::test]
async fn download_cancellation_cleans_up() {
    let temp = tempdir().unwrap();
    build_install_tree(temp.path(), &["003"], &[("game.pak", PAK_V3)]);

    let server = StubServer::start().await;
    server.route("/update/versionmap", StubResponse::Json(version_map_json()));
    server.route(
        "/slow.zip",
        StubResponse::Slow {
            chunk: vec![0u8; 1024],
            chunks: 200,
            delay: Duration::from_millis(25),
        },
    );

    let updater = Updater::new(UpdaterConfig::new(temp.path(), server.url())).await.unwrap();
    let destination = temp.path().join("partial.zip");
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::unbounded_channel();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        canceller.cancel();
    });

    let url = format!("{}/slow.zip", server.url());
    let err = updater.download(&url, &destination, &cancel, tx).await.unwrap_err();

    let updater_err = err.downcast_ref::<UpdaterError>().expect("typed error");
    assert!(updater_err.is_cancelled());

    let events = drain(rx).await;
    assert!(events.iter().all(|e| !e.completed));
    assert!(events.iter().any(|e| e.error.is_some()));
    assert!(!destination.exists());
}

/// A package-resolution response without `update_url` is a protocol error.
#[tokio::test]
async fn missing_update_url_is_an_error() {
    let temp = tempdir().unwrap();
    build_install_tree(temp.path(), &["003"], &[("game.pak", PAK_V3)]);

    let server = StubServer::start().await;
    server.route("/update/versionmap", StubResponse::Json(version_map_json()));
    server.route("/update/package/deadbeef", StubResponse::Json(r#"{"mirror": "x"}"#.into()));

    let updater = Updater::new(UpdaterConfig::new(temp.path(), server.url())).await.unwrap();
    let err = updater.resolve_package_url("deadbeef").await.unwrap_err();

    let updater_err = err.downcast_ref::<UpdaterError>().expect("typed error");
    assert!(matches!(updater_err, UpdaterError::MissingField { .. }));
}

#[tokio::test]
async fn remote_manifest_http_failure_surfaces_status() {
    let temp = tempdir().unwrap();
    build_install_tree(temp.path(), &["003"], &[("game.pak", PAK_V3)]);

    let server = StubServer::start().await;
    server.route("/update/versionmap", StubResponse::Json(version_map_json()));
    server.route("/update/hashes/latest", StubResponse::Status(500));

    let updater = Updater::new(UpdaterConfig::new(temp.path(), server.url())).await.unwrap();
    let err = updater.remote_manifest("latest").await.unwrap_err();

    let updater_err = err.downcast_ref::<UpdaterError>().expect("typed error");
    assert!(matches!(updater_err, UpdaterError::HttpStatus { .. }));
}
