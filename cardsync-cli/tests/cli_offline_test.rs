#![allow(deprecated)] // Command::cargo_bin: the macro alternative requires a same-package binary

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

// Nothing listens on the discard port, so every request fails fast.
const UNREACHABLE: &str = "http://127.0.0.1:9";

// ---------------------------------------------------------------------------
// Helper: a hermetic command pointed at `data_dir` and an unreachable remote,
// with retries fast enough to keep the tests quick.
// ---------------------------------------------------------------------------
fn cardsync_cmd(data_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("cardsync").unwrap();
    cmd.env_remove("CARDSYNC_CACHE_KEY")
        .env_remove("CARDSYNC_REMOTE_URL")
        .env_remove("CARDSYNC_REMOTE_TIMEOUT_SECS")
        .env("CARDSYNC_DATA_DIR", data_dir)
        .env("CARDSYNC_MAX_RETRIES", "2")
        .env("CARDSYNC_RETRY_BASE_DELAY_MS", "1")
        .env("CARDSYNC_RETRY_MAX_DELAY_MS", "5")
        .env("RUST_LOG", "off")
        .args(["--remote-url", UNREACHABLE]);
    cmd
}

#[test]
fn add_offline_keeps_change_locally() {
    let dir = tempfile::tempdir().unwrap();

    cardsync_cmd(dir.path())
        .args(["add", "card-a", "--foil"])
        .assert()
        .success()
        .stdout("1\n")
        .stderr(contains("change kept locally"));

    cardsync_cmd(dir.path())
        .args(["add", "card-a", "--foil"])
        .assert()
        .success()
        .stdout("2\n");

    cardsync_cmd(dir.path())
        .args(["quantity", "card-a", "--foil"])
        .assert()
        .success()
        .stdout("2\n")
        .stderr(contains("warning"));

    cardsync_cmd(dir.path())
        .args(["quantity", "card-a"])
        .assert()
        .success()
        .stdout("0\n");
}

#[test]
fn remove_drops_empty_record() {
    let dir = tempfile::tempdir().unwrap();

    cardsync_cmd(dir.path()).args(["add", "card-b"]).assert().success();
    cardsync_cmd(dir.path())
        .args(["remove", "card-b"])
        .assert()
        .success()
        .stdout("0\n");

    cardsync_cmd(dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout("0 cards (0 unique, 0 foil)\n");
}

#[test]
fn remove_absent_card_is_noop() {
    let dir = tempfile::tempdir().unwrap();

    cardsync_cmd(dir.path())
        .args(["remove", "ghost"])
        .assert()
        .success()
        .stdout("0\n")
        .stderr(contains("sync failed").not());
}

#[test]
fn export_then_import_into_fresh_dir() {
    let source = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    let backup = source.path().join("backup.json");

    cardsync_cmd(source.path()).args(["add", "card-a"]).assert().success();
    cardsync_cmd(source.path())
        .args(["add", "card-c", "--foil"])
        .assert()
        .success();
    cardsync_cmd(source.path())
        .args(["export", "--output"])
        .arg(&backup)
        .assert()
        .success();

    let exported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&backup).unwrap()).unwrap();
    assert_eq!(exported["version"], "1.0");
    assert_eq!(exported["collection"]["card-c"]["foil"], 1);

    cardsync_cmd(target.path())
        .arg("import")
        .arg(&backup)
        .assert()
        .success()
        .stdout(contains("Imported 2 cards (2 unique)"));

    cardsync_cmd(target.path())
        .arg("show")
        .assert()
        .success()
        .stdout(contains("card-a\tnormal: 1\tfoil: 0"))
        .stdout(contains("card-c\tnormal: 0\tfoil: 1"));
}

#[test]
fn import_rejects_invalid_file() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, r#"{"decks": []}"#).unwrap();

    cardsync_cmd(dir.path())
        .arg("import")
        .arg(&bad)
        .assert()
        .failure()
        .stderr(contains("missing collection"));
}

#[test]
fn status_reports_offline_load() {
    let dir = tempfile::tempdir().unwrap();

    cardsync_cmd(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("remote: http://127.0.0.1:9"))
        .stdout(contains("loaded from: empty"))
        .stdout(contains("last synced: never"));
}
