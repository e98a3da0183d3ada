use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::tempdir;

const ADDRESS: &str = "0x00000000000000000000000000000000000000aa";

fn dreava(temp: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("dreava"));
    cmd.arg("--config")
        .arg(temp.join("config.yaml"))
        .arg("--cache-dir")
        .arg(temp.join("cache"))
        .arg("--api-host")
        .arg("http://127.0.0.1:1")
        .env_remove("DREAVA_ACCOUNT")
        .env_remove("DREAVA_FORMAT")
        .env_remove("DREAVA_NO_CACHE")
        .env_remove("DREAVA_CACHE_VERSION")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn version_prints_package_version() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    dreava(temp.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dreava version"));
    Ok(())
}

#[test]
fn cache_path_honours_override() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let expected = temp.path().join("cache");
    dreava(temp.path())
        .args(["cache", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.to_string_lossy().to_string()));
    Ok(())
}

#[test]
fn list_without_account_reports_no_wallet() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    dreava(temp.path())
        .args(["collections", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No wallet account"));
    Ok(())
}

#[test]
fn added_collection_is_listed_as_pending() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    dreava(temp.path())
        .args(["collections", "add", ADDRESS, "--name", "Foo"])
        .assert()
        .success();

    let assert = dreava(temp.path())
        .args(["collections", "pending", "--format", "json"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(stdout.contains(ADDRESS));
    assert!(stdout.contains("Foo"));
    Ok(())
}

#[test]
fn add_rejects_malformed_address() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    dreava(temp.path())
        .args(["collections", "add", "0x1234"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
    Ok(())
}

#[test]
fn activate_creates_versioned_buckets() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    dreava(temp.path())
        .args(["router", "activate", "--cache-version", "v5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("v5"));

    dreava(temp.path())
        .args(["router", "buckets", "--cache-version", "v5", "--format", "table"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dreava-api-v5"))
        .stdout(predicate::str::contains("dreava-images-v5"));
    Ok(())
}

#[test]
fn activating_new_version_deletes_old_buckets() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    dreava(temp.path())
        .args(["router", "activate", "--cache-version", "v1"])
        .assert()
        .success();

    dreava(temp.path())
        .args(["router", "activate", "--cache-version", "v2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted dreava-api-v1"));

    dreava(temp.path())
        .args(["router", "buckets", "--cache-version", "v2", "--format", "table"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dreava-api-v1").not());
    Ok(())
}

#[test]
fn router_requires_storage() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    dreava(temp.path())
        .args(["router", "buckets", "--no-cache"])
        .assert()
        .failure();
    Ok(())
}

#[test]
fn completion_generates_bash_script() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    dreava(temp.path())
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dreava"));
    Ok(())
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[test]
fn status_reports_reachable_backend() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let _status = server
        .mock("GET", "/api/status")
        .with_status(200)
        .with_body("{}")
        .create();

    let temp = tempdir()?;
    let assert = Command::new(assert_cmd::cargo::cargo_bin!("dreava"))
        .arg("status")
        .arg("--config")
        .arg(temp.path().join("config.yaml"))
        .arg("--cache-dir")
        .arg(temp.path().join("cache"))
        .arg("--account")
        .arg(ADDRESS)
        .env("DREAVA_API_HOST", server.url())
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(stdout.contains("Backend reachable"));
    assert!(stdout.contains(ADDRESS));
    Ok(())
}
