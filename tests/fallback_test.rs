use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::net::TcpListener;
use std::process::Command;

/// Starts the binary on a port that is already taken, so it exits right
/// after choosing its store.
fn run_against_occupied_port(db_path: &std::path::Path) -> assert_cmd::assert::Assert {
    let occupied = TcpListener::bind("0.0.0.0:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let mut cmd = Command::new(cargo_bin!("wallet-ledger"));
    cmd.env_remove("RUST_LOG")
        .arg("--http-port")
        .arg(port.to_string())
        .arg("--db-path")
        .arg(db_path);

    let assert = cmd.assert();
    drop(occupied);
    assert
}

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let dir = tempfile::tempdir().unwrap();

    run_against_occupied_port(&dir.path().join("wallets_db"))
        .failure()
        .stderr(predicate::str::contains(
            "falling back to in-memory storage",
        ));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_no_fallback_warning() {
    let dir = tempfile::tempdir().unwrap();

    run_against_occupied_port(&dir.path().join("wallets_db"))
        .failure()
        .stderr(predicate::str::contains("falling back").not());
}
