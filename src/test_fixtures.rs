//! Test fixtures shared by unit tests
//!
//! [`FixtureRemote`] is a non-bare git repository laid out like a component
//! registry, reachable through a `file://` URL. [`pipeline`] creates an empty
//! pipeline project next to it.

use std::path::{Path, PathBuf};

use git2::{IndexAddOption, Repository, RepositoryInitOptions, Signature};
use tempfile::TempDir;

/// `main.nf` of a module with the given process name
pub fn module_main(process: &str) -> String {
    format!(
        "process {process} {{\n    tag \"$meta.id\"\n    label 'process_medium'\n\n    input:\n    tuple val(meta), path(reads)\n\n    output:\n    tuple val(meta), path(\"*.html\"), emit: html\n    path \"versions.yml\"           , emit: versions\n\n    script:\n    \"\"\"\n    {} $reads\n    \"\"\"\n}}\n",
        process.to_lowercase()
    )
}

/// A git repository laid out like a component registry
pub struct FixtureRemote {
    pub repo: Repository,
    pub temp: TempDir,
}

impl FixtureRemote {
    /// Empty repository whose HEAD is `main`
    pub fn empty() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(temp.path(), &opts).expect("Failed to init repository");
        Self { repo, temp }
    }

    /// Repository with `fastqc`, `bismark/align`, five samtools modules and two subworkflows
    pub fn standard() -> Self {
        let remote = Self::empty();
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
            "subworkflows/nf-core/bam_stats_samtools/meta.yml",
            "name: bam_stats_samtools\n",
        );
        remote.write(
            "subworkflows/nf-core/bam_sort_stats_samtools/main.nf",
            "include { SAMTOOLS_SORT      } from '../../../modules/nf-core/samtools/sort/main'\n\
             include { SAMTOOLS_INDEX     } from '../../../modules/nf-core/samtools/index/main'\n\
             include { BAM_STATS_SAMTOOLS } from '../bam_stats_samtools/main'\n\n\
             workflow BAM_SORT_STATS_SAMTOOLS {\n}\n",
        );
        remote.write(
            "subworkflows/nf-core/bam_sort_stats_samtools/meta.yml",
            "name: bam_sort_stats_samtools\n",
        );
        remote.commit("Add initial components");
        remote
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn url(&self) -> String {
        format!("file://{}", self.temp.path().display())
    }

    /// Write `main.nf`, `meta.yml` and a test file for a module
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
        std::fs::create_dir_all(path.parent().expect("relative path has a parent"))
            .expect("Failed to create directory");
        std::fs::write(path, bytes).expect("Failed to write file");
    }

    pub fn remove(&self, rel: &str) {
        let path = self.temp.path().join(rel);
        if path.is_dir() {
            std::fs::remove_dir_all(path).expect("Failed to remove directory");
        } else {
            std::fs::remove_file(path).expect("Failed to remove file");
        }
    }

    /// Commit the whole working tree, returning the full hash
    pub fn commit(&self, message: &str) -> String {
        let mut index = self.repo.index().expect("index");
        index
            .add_all(["*"], IndexAddOption::DEFAULT, None)
            .expect("add_all");
        index
            .update_all(["*"], None)
            .expect("update_all");
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

    /// Full hash of the current HEAD commit
    pub fn head(&self) -> String {
        self.repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .expect("HEAD commit")
            .id()
            .to_string()
    }

    /// Create a branch at the current HEAD
    pub fn branch(&self, name: &str) {
        let head = self
            .repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .expect("HEAD commit");
        self.repo.branch(name, &head, false).expect("branch");
    }
}

/// A pipeline project with a `main.nf` and a `nextflow.config`
pub fn pipeline() -> (TempDir, PathBuf) {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let path = temp.path().to_path_buf();
    std::fs::write(path.join("main.nf"), "nextflow.enable.dsl = 2\n").expect("write main.nf");
    std::fs::write(
        path.join("nextflow.config"),
        "manifest {\n    name = 'nf-core/testpipeline'\n    homePage = 'https://github.com/nf-core/testpipeline'\n}\n",
    )
    .expect("write nextflow.config");
    (temp, path)
}
