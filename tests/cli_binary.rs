use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin("skyreview").unwrap()
}

const CONTENT: &str = "The dune bashing was thrilling and our guide was excellent!!";

// --- Help & version ---

#[test]
fn help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("review board"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("skyreview"));
}

#[test]
fn submit_help_lists_channels() {
    cmd()
        .args(["submit", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("whatsapp"));
}

// --- Local source ---

#[test]
fn stats_on_fresh_local_store() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(&tmp)
        .args(["stats", "--source", "local"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Average rating: 4.7"))
        .stdout(predicate::str::contains("Approved reviews: 3"));
    assert!(tmp.path().join(".skyreview/goldensky_reviews.json").exists());
}

#[test]
fn show_renders_html() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(&tmp)
        .args(["show", "--source", "local", "--page-size", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"class="review-card""#))
        .stdout(predicate::str::contains("Load More Reviews (1 more)"));
}

#[test]
fn show_with_custom_store_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let store = tmp.path().join("data");
    cmd()
        .current_dir(&tmp)
        .args(["show", "--source", "local", "--store-dir"])
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("Sarah M."));
    assert!(store.join("goldensky_reviews.json").exists());
}

#[test]
fn clear_cache_succeeds_without_cache() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(&tmp)
        .arg("clear-cache")
        .assert()
        .success()
        .stdout(predicate::str::contains("Review cache cleared."));
}

// --- Submission ---

#[test]
fn submit_without_rating_fails() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(&tmp)
        .args([
            "submit", "--dry-run", "--name", "Sam", "--email", "sam@x.com", "--content", CONTENT,
            "--consent",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("please select a rating"));
}

#[test]
fn submit_dry_run_prints_issue_link() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join(".skyreview.toml"),
        "source = \"local\"\nowner = \"goldensky\"\nrepo = \"site\"\n",
    )
    .unwrap();
    cmd()
        .current_dir(&tmp)
        .args([
            "submit",
            "--dry-run",
            "--name",
            "Sam",
            "--email",
            "sam@x.com",
            "--rating",
            "4",
            "--tour",
            "Desert Safari",
            "--content",
            CONTENT,
            "--consent",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "https://github.com/goldensky/site/issues/new?title=Review%20from%20Sam",
        ))
        .stdout(predicate::str::contains("pending moderation"));

    let stored = fs::read_to_string(tmp.path().join(".skyreview/goldensky_reviews.json")).unwrap();
    assert!(stored.contains("\"pending\":true"));
}

#[test]
fn submit_reads_content_file() {
    let tmp = tempfile::tempdir().unwrap();
    let review = tmp.path().join("review.txt");
    fs::write(&review, "too short").unwrap();
    cmd()
        .current_dir(&tmp)
        .args([
            "submit", "--dry-run", "--name", "Sam", "--email", "sam@x.com", "--rating", "4",
            "--consent", "--content-file",
        ])
        .arg(&review)
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 50 characters"));
}

// --- Config errors ---

#[test]
fn config_file_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(&tmp)
        .args(["stats", "--config", "/nonexistent.toml"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn unknown_config_field_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join(".skyreview.toml"), "colour = \"gold\"\n").unwrap();
    cmd()
        .current_dir(&tmp)
        .arg("stats")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("config parse error"));
}

#[test]
fn remote_source_requires_repository() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(&tmp)
        .args(["stats", "--source", "remote"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("owner and repo must be set"));
}

#[test]
fn unknown_source_rejected_by_clap() {
    cmd()
        .args(["stats", "--source", "jira"])
        .assert()
        .failure()
        .code(2);
}
