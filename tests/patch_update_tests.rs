//! Patching and updating through the binary

mod common;

use common::{TestPipeline, TestRemote, entry, module_main};
use predicates::prelude::*;

const FASTQC_MAIN: &str = "modules/nf-core/fastqc/main.nf";
const FASTQC_LOGO: &str = "modules/nf-core/fastqc/assets/logo.png";

fn raise_label(pipeline: &TestPipeline, path: &str) {
    let content = pipeline.read_file(path).replace("process_medium", "process_high");
    pipeline.write_file(path, &content);
}

/// Remote plus a pipeline holding fastqc at the first revision, then one upstream change
fn installed_then_changed(change: impl FnOnce(&TestRemote)) -> (TestRemote, TestPipeline, String) {
    let remote = TestRemote::new();
    let pipeline = TestPipeline::new();
    pipeline.nfcomp("modules", &remote).args(["install", "fastqc"]).assert().success();
    let first = remote.head();
    change(&remote);
    remote.commit("Upstream change");
    (remote, pipeline, first)
}

#[test]
fn test_patch_records_local_change() {
    let remote = TestRemote::new();
    let pipeline = TestPipeline::new();
    pipeline.nfcomp("modules", &remote).args(["install", "bismark/align"]).assert().success();
    raise_label(&pipeline, "modules/nf-core/bismark/align/main.nf");

    pipeline
        .nfcomp("modules", &remote)
        .args(["patch", "bismark/align"])
        .assert()
        .success()
        .stdout(predicate::str::contains("+    label 'process_high'"));

    let patch = pipeline.read_file("modules/nf-core/bismark/align/bismark-align.diff");
    assert!(patch.contains("-    label 'process_medium'"));
    assert!(patch.contains("+    label 'process_high'"));
    let manifest = pipeline.manifest();
    assert_eq!(
        entry(&manifest, &remote, "modules", "bismark/align")["patch"],
        "modules/nf-core/bismark/align/bismark-align.diff"
    );
}

#[test]
fn test_patch_unchanged_component() {
    let remote = TestRemote::new();
    let pipeline = TestPipeline::new();
    pipeline.nfcomp("modules", &remote).args(["install", "fastqc"]).assert().success();

    pipeline
        .nfcomp("modules", &remote)
        .args(["patch", "fastqc"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unchanged"));
    assert!(!pipeline.file_exists("modules/nf-core/fastqc/fastqc.diff"));
}

#[test]
fn test_patch_remove_restores_pristine_files() {
    let remote = TestRemote::new();
    let pipeline = TestPipeline::new();
    pipeline.nfcomp("modules", &remote).args(["install", "fastqc"]).assert().success();
    let pristine = pipeline.read_file(FASTQC_MAIN);
    raise_label(&pipeline, FASTQC_MAIN);
    pipeline.nfcomp("modules", &remote).args(["patch", "fastqc"]).assert().success();

    pipeline
        .nfcomp("modules", &remote)
        .args(["patch", "fastqc", "--remove"])
        .assert()
        .success();

    assert_eq!(pipeline.read_file(FASTQC_MAIN), pristine);
    assert!(!pipeline.file_exists("modules/nf-core/fastqc/fastqc.diff"));
    let manifest = pipeline.manifest();
    assert!(entry(&manifest, &remote, "modules", "fastqc").get("patch").is_none());
}

/// Remote whose fastqc ships a binary logo, installed in a pipeline that changed the logo and patched it
fn patched_logo() -> (TestRemote, TestPipeline) {
    let remote = TestRemote::new();
    remote.write_bytes("modules/nf-core/fastqc/assets/logo.png", &[0, 1, 2]);
    remote.commit("Add logo");
    let pipeline = TestPipeline::new();
    pipeline.nfcomp("modules", &remote).args(["install", "fastqc"]).assert().success();
    pipeline.write_bytes(FASTQC_LOGO, &[0, 9, 9]);
    pipeline.nfcomp("modules", &remote).args(["patch", "fastqc"]).assert().success();
    (remote, pipeline)
}

#[test]
fn test_patch_remove_restores_binary_asset() {
    let (remote, pipeline) = patched_logo();
    assert!(pipeline.read_file("modules/nf-core/fastqc/fastqc.diff").contains("Binary files"));

    pipeline
        .nfcomp("modules", &remote)
        .args(["patch", "fastqc", "--remove"])
        .assert()
        .success();

    assert_eq!(pipeline.read_bytes(FASTQC_LOGO), vec![0u8, 1, 2]);
    assert!(!pipeline.file_exists("modules/nf-core/fastqc/fastqc.diff"));
}

#[test]
fn test_patched_binary_asset_survives_update() {
    let (remote, pipeline) = patched_logo();
    remote.write("modules/nf-core/fastqc/meta.yml", "name: fastqc\ndescription: Read QC\n");
    remote.commit("Describe fastqc");

    pipeline.nfcomp("modules", &remote).args(["update", "fastqc"]).assert().success();

    assert_eq!(pipeline.read_bytes(FASTQC_LOGO), vec![0u8, 9, 9]);
    assert!(pipeline.read_file("modules/nf-core/fastqc/meta.yml").contains("Read QC"));
    let manifest = pipeline.manifest();
    assert_eq!(entry(&manifest, &remote, "modules", "fastqc")["patch"], "modules/nf-core/fastqc/fastqc.diff");
}

#[test]
fn test_update_to_latest() {
    let (remote, pipeline, first) =
        installed_then_changed(|r| r.write("modules/nf-core/fastqc/meta.yml", "name: fastqc\ndescription: Read QC\n"));

    pipeline
        .nfcomp("modules", &remote)
        .args(["update", "fastqc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated:"));

    assert!(pipeline.read_file("modules/nf-core/fastqc/meta.yml").contains("Read QC"));
    let manifest = pipeline.manifest();
    let fastqc = entry(&manifest, &remote, "modules", "fastqc");
    assert_ne!(fastqc["git_sha"], first);
    assert_eq!(fastqc["git_sha"], remote.head());
}

#[test]
fn test_update_when_up_to_date() {
    let remote = TestRemote::new();
    let pipeline = TestPipeline::new();
    pipeline.nfcomp("modules", &remote).args(["install", "fastqc"]).assert().success();
    let before = pipeline.read_file("modules.json");

    pipeline
        .nfcomp("modules", &remote)
        .args(["update", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated:").not());

    assert_eq!(pipeline.read_file("modules.json"), before);
}

#[test]
fn test_patch_survives_update() {
    let remote = TestRemote::new();
    let pipeline = TestPipeline::new();
    pipeline.nfcomp("modules", &remote).args(["install", "fastqc"]).assert().success();
    raise_label(&pipeline, FASTQC_MAIN);
    pipeline.nfcomp("modules", &remote).args(["patch", "fastqc"]).assert().success();
    remote.write("modules/nf-core/fastqc/meta.yml", "name: fastqc\ndescription: Read QC\n");
    remote.commit("Describe fastqc");

    pipeline.nfcomp("modules", &remote).args(["update", "fastqc"]).assert().success();

    assert!(pipeline.read_file(FASTQC_MAIN).contains("process_high"));
    assert!(pipeline.read_file("modules/nf-core/fastqc/meta.yml").contains("Read QC"));
    let manifest = pipeline.manifest();
    let fastqc = entry(&manifest, &remote, "modules", "fastqc");
    assert_eq!(fastqc["git_sha"], remote.head());
    assert_eq!(fastqc["patch"], "modules/nf-core/fastqc/fastqc.diff");
}

#[test]
fn test_conflicting_patch_fails_update() {
    let remote = TestRemote::new();
    let pipeline = TestPipeline::new();
    pipeline.nfcomp("modules", &remote).args(["install", "fastqc"]).assert().success();
    let first = remote.head();
    raise_label(&pipeline, FASTQC_MAIN);
    pipeline.nfcomp("modules", &remote).args(["patch", "fastqc"]).assert().success();
    remote.write(
        FASTQC_MAIN,
        &module_main("FASTQC").replace("process_medium", "process_low"),
    );
    remote.commit("Lower the fastqc label");

    pipeline
        .nfcomp("modules", &remote)
        .args(["update", "fastqc"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("does not apply"));

    assert!(pipeline.read_file(FASTQC_MAIN).contains("process_high"));
    let manifest = pipeline.manifest();
    assert_eq!(entry(&manifest, &remote, "modules", "fastqc")["git_sha"], first);
}

#[test]
fn test_save_diff_leaves_project_untouched() {
    let (remote, pipeline, first) = installed_then_changed(|r| r.write_module("fastqc", "FASTQC_V2"));
    let before = pipeline.read_file(FASTQC_MAIN);
    let diff_file = pipeline.cache.path().join("changes.diff");

    pipeline
        .nfcomp("modules", &remote)
        .args(["update", "--all", "--save-diff"])
        .arg(&diff_file)
        .assert()
        .success();

    let diff = std::fs::read_to_string(&diff_file).unwrap();
    assert!(diff.contains("+process FASTQC_V2 {"));
    assert!(diff.contains("************************************************************"));
    assert_eq!(pipeline.read_file(FASTQC_MAIN), before);
    let manifest = pipeline.manifest();
    assert_eq!(entry(&manifest, &remote, "modules", "fastqc")["git_sha"], first);
}

#[test]
fn test_show_diff_without_terminal_declines() {
    let (remote, pipeline, first) = installed_then_changed(|r| r.write_module("fastqc", "FASTQC_V2"));
    let before = pipeline.read_file(FASTQC_MAIN);

    pipeline
        .nfcomp("modules", &remote)
        .args(["update", "fastqc", "--show-diff"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FASTQC_V2"));

    assert_eq!(pipeline.read_file(FASTQC_MAIN), before);
    let manifest = pipeline.manifest();
    assert_eq!(entry(&manifest, &remote, "modules", "fastqc")["git_sha"], first);
}

#[test]
fn test_pinned_component_is_skipped() {
    let (remote, pipeline, first) = installed_then_changed(|r| r.write_module("fastqc", "FASTQC_V2"));
    pipeline.write_file(
        ".nf-core.yml",
        &format!(
            "repository_type: pipeline\nupdate:\n  {}:\n    nf-core:\n      fastqc: false\n",
            remote.url()
        ),
    );

    pipeline.nfcomp("modules", &remote).args(["update", "--all"]).assert().success();

    assert!(pipeline.read_file(FASTQC_MAIN).contains("process FASTQC {"));
    let manifest = pipeline.manifest();
    assert_eq!(entry(&manifest, &remote, "modules", "fastqc")["git_sha"], first);
}
