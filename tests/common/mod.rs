//! Common test utilities for nfcomp integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use git2::{IndexAddOption, Repository, RepositoryInitOptions, Signature};
use tempfile::TempDir;

/// `main.nf` of a module with the given process name
pub fn module_main(process: &str) -> String {
    format!(
        "process {process} {{\n    label 'process_medium'\n\n    input:\n    tuple val(meta), path(reads)\n\n    output:\n    path \"versions.yml\", emit: versions\n\n    script:\n    \"\"\"\n    {} $reads\n    \"\"\"\n}}\n",
        process.to_lowercase()
    )
}

/// A git repository laid out like a component registry
pub struct TestRemote {
    pub repo: Repository,
    pub temp: TempDir,
}

impl TestRemote {
    /// Registry with fastqc, bismark/align, five samtools modules and two subworkflows
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(temp.path(), &opts).expect("Failed to init repository");
        let remote = Self { repo, temp };

        remote.write_module("fastqc", "FASTQC");
        remote.write_module("bismark/align", "BISMARK_ALIGN");
        for (name, process) in [
            ("samtools/sort", "SAMTOOLS_SORT"),
            ("samtools/index", "SAMTOOLS_INDEX"),
            ("samtools/stats", "SAMTOOLS_STATS"),
            ("samtools/idxstats", "SAMTOOLS_IDXSTATS"),
            ("samtools/flagstat", "SAMTOOLS_FLAGSTAT"),
        ] {
            remote.write_module(name, process);
        }
        remote.write(
            "subworkflows/nf-core/bam_stats_samtools/main.nf",
            "include { SAMTOOLS_STATS    } from '../../../modules/nf-core/samtools/stats/main'\n\
             include { SAMTOOLS_IDXSTATS } from '../../../modules/nf-core/samtools/idxstats/main'\n\
             include { SAMTOOLS_FLAGSTAT } from '../../../modules/nf-core/samtools/flagstat/main'\n\n\
             workflow BAM_STATS_SAMTOOLS {\n}\n",
        );
        remote.write(
            "subworkflows/nf-core/bam_sort_stats_samtools/main.nf",
            "include { SAMTOOLS_SORT      } from '../../../modules/nf-core/samtools/sort/main'\n\
             include { SAMTOOLS_INDEX     } from '../../../modules/nf-core/samtools/index/main'\n\
             include { BAM_STATS_SAMTOOLS } from '../bam_stats_samtools/main'\n\n\
             workflow BAM_SORT_STATS_SAMTOOLS {\n}\n",
        );
        remote.commit("Add initial components");
        remote
    }

    pub fn url(&self) -> String {
        format!("file://{}", self.temp.path().display())
    }

    pub fn write_module(&self, name: &str, process: &str) {
        let dir = format!("modules/nf-core/{name}");
        self.write(&format!("{dir}/main.nf"), &module_main(process));
        self.write(&format!("{dir}/meta.yml"), &format!("name: {}\n", name.replace('/', "_")));
        self.write(&format!("{dir}/tests/main.nf.test"), "nextflow_process {}\n");
    }

    pub fn write(&self, rel: &str, content: &str) {
        self.write_bytes(rel, content.as_bytes());
    }

    pub fn write_bytes(&self, rel: &str, bytes: &[u8]) {
        let path = self.temp.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directory");
        }
        std::fs::write(path, bytes).expect("Failed to write file");
    }

    /// Commit the whole working tree, returning the full hash
    pub fn commit(&self, message: &str) -> String {
        let mut index = self.repo.index().expect("index");
        index
            .add_all(["*"], IndexAddOption::DEFAULT, None)
            .expect("add_all");
        index.write().expect("index write");
        let tree_id = index.write_tree().expect("write_tree");
        let tree = self.repo.find_tree(tree_id).expect("find_tree");
        let sig = Signature::now("Fixture", "fixture@example.com").expect("signature");
        let parents: Vec<git2::Commit<'_>> = self
            .repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok())
            .into_iter()
            .collect();
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .expect("commit")
            .to_string()
    }

    pub fn head(&self) -> String {
        self.repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .expect("HEAD commit")
            .id()
            .to_string()
    }
}

/// A pipeline project for integration tests
pub struct TestPipeline {
    pub temp: TempDir,
    /// Path to the pipeline root
    pub path: PathBuf,
    /// Mirror cache private to this test
    pub cache: TempDir,
}

impl TestPipeline {
    /// Pipeline with a `main.nf` and a `nextflow.config` manifest block
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().to_path_buf();
        let cache = TempDir::new().expect("Failed to create cache directory");
        let pipeline = Self { temp, path, cache };
        pipeline.write_file("main.nf", "nextflow.enable.dsl = 2\n");
        pipeline.write_file(
            "nextflow.config",
            "manifest {\n    name = 'nf-core/testpipeline'\n    homePage = 'https://github.com/nf-core/testpipeline'\n}\n",
        );
        pipeline
    }

    /// Write a file in the pipeline
    pub fn write_file(&self, path: &str, content: &str) {
        self.write_bytes(path, content.as_bytes());
    }

    /// Write raw bytes to a file in the pipeline
    pub fn write_bytes(&self, path: &str, bytes: &[u8]) {
        let file_path = self.path.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, bytes).expect("Failed to write file");
    }

    /// Read raw bytes of a file in the pipeline
    pub fn read_bytes(&self, path: &str) -> Vec<u8> {
        std::fs::read(self.path.join(path)).expect("Failed to read file")
    }

    /// Read a file from the pipeline
    pub fn read_file(&self, path: &str) -> String {
        std::fs::read_to_string(self.path.join(path)).expect("Failed to read file")
    }

    /// Check if a file exists in the pipeline
    pub fn file_exists(&self, path: &str) -> bool {
        self.path.join(path).exists()
    }

    /// `modules.json` parsed
    pub fn manifest(&self) -> serde_json::Value {
        serde_json::from_str(&self.read_file("modules.json")).expect("modules.json is JSON")
    }

    /// `nfcomp` run in this pipeline against `remote`, with a private mirror cache
    pub fn nfcomp(&self, kind: &str, remote: &TestRemote) -> Command {
        let mut cmd = nfcomp_cmd(&self.path, self.cache.path());
        cmd.args([kind, "--git-remote", &remote.url()]);
        cmd
    }
}

/// The nfcomp binary with its working directory and cache set
pub fn nfcomp_cmd(dir: &Path, cache: &Path) -> Command {
    let mut cmd = Command::cargo_bin("nfcomp").expect("nfcomp binary");
    cmd.current_dir(dir)
        .env("NFCOMP_CACHE_DIR", cache)
        .env_remove("NFCOMP_DIR")
        .env_remove("NFCOMP_GIT_REMOTE")
        .env_remove("RUST_LOG");
    cmd
}

/// Manifest entry of a component
pub fn entry<'a>(
    manifest: &'a serde_json::Value,
    remote: &TestRemote,
    kind: &str,
    name: &str,
) -> &'a serde_json::Value {
    &manifest["repos"][remote.url()][kind]["nf-core"][name]
}
