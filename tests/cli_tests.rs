//! Command-line surface: help, completions and project checks

mod common;

use common::{TestPipeline, TestRemote, nfcomp_cmd};
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_help_lists_component_commands() {
    let cache = TempDir::new().unwrap();
    nfcomp_cmd(cache.path(), cache.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("modules"))
        .stdout(predicate::str::contains("subworkflows"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn test_modules_help_lists_actions() {
    let cache = TempDir::new().unwrap();
    nfcomp_cmd(cache.path(), cache.path())
        .args(["modules", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("remove"))
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("patch"));
}

#[test]
fn test_completions_for_bash() {
    let cache = TempDir::new().unwrap();
    nfcomp_cmd(cache.path(), cache.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nfcomp"));
}

#[test]
fn test_completions_for_unknown_shell() {
    let cache = TempDir::new().unwrap();
    nfcomp_cmd(cache.path(), cache.path())
        .args(["completions", "--shell", "tcsh"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("tcsh"));
}

#[test]
fn test_missing_name_needs_a_terminal() {
    let remote = TestRemote::new();
    let pipeline = TestPipeline::new();
    pipeline
        .nfcomp("modules", &remote)
        .arg("install")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("interactive terminal"));
    assert!(!pipeline.file_exists("modules/nf-core"));

    pipeline.nfcomp("modules", &remote).args(["install", "fastqc"]).assert().success();
    for action in ["update", "remove", "patch"] {
        pipeline
            .nfcomp("modules", &remote)
            .arg(action)
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Module name"));
    }
    assert!(pipeline.file_exists("modules/nf-core/fastqc/main.nf"));
}

#[test]
fn test_not_a_pipeline() {
    let remote = TestRemote::new();
    let empty = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    nfcomp_cmd(empty.path(), cache.path())
        .args(["modules", "--git-remote", &remote.url(), "install", "fastqc"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("main.nf"));
    assert!(!empty.path().join("modules.json").exists());
}

#[test]
fn test_dir_flag_points_at_pipeline() {
    let remote = TestRemote::new();
    let pipeline = TestPipeline::new();
    let elsewhere = TempDir::new().unwrap();
    nfcomp_cmd(elsewhere.path(), pipeline.cache.path())
        .arg("-d")
        .arg(&pipeline.path)
        .args(["modules", "--git-remote", &remote.url(), "install", "fastqc"])
        .assert()
        .success();
    assert!(pipeline.file_exists("modules/nf-core/fastqc/main.nf"));
}

#[test]
fn test_producer_repository_refused() {
    let remote = TestRemote::new();
    let pipeline = TestPipeline::new();
    pipeline.write_file(".nf-core.yml", "repository_type: modules\n");
    pipeline
        .nfcomp("modules", &remote)
        .args(["install", "fastqc"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("repository of type 'modules'"));
    assert!(!pipeline.file_exists("modules.json"));
}

#[test]
fn test_unreachable_remote() {
    let pipeline = TestPipeline::new();
    let missing = TempDir::new().unwrap();
    let url = format!("file://{}", missing.path().join("nowhere").display());
    nfcomp_cmd(&pipeline.path, pipeline.cache.path())
        .args(["modules", "--git-remote", &url, "install", "fastqc"])
        .assert()
        .failure()
        .code(3);
}
