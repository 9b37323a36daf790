//! In-memory component file trees
//!
//! A [`FileSet`] maps forward-slash relative paths to raw bytes. Upstream
//! snapshots, installed copies and patched candidates are all `FileSet`s, so
//! diffing, patching and comparison never touch the disk.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::{RegistryError, Result};
use crate::hash::{hash_bytes, hash_file};
use crate::paths::TESTS_DIR;

/// Files of one component, keyed by path relative to the component directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: BTreeMap<String, Vec<u8>>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a component directory, skipping the test subtree and any `exclude`d file names
    pub fn read_dir(dir: &Path, exclude: &[&str]) -> Result<Self> {
        let mut set = FileSet::new();
        if !dir.is_dir() {
            return Ok(set);
        }

        let walker = WalkDir::new(dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !(e.depth() == 1 && e.file_type().is_dir() && e.file_name() == TESTS_DIR));

        for entry in walker {
            let entry = entry.map_err(|e| RegistryError::FileReadFailed {
                path: dir.display().to_string(),
                reason: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = relative_key(dir, entry.path());
            if exclude.contains(&rel.as_str()) {
                continue;
            }
            let bytes = fs::read(entry.path()).map_err(|e| RegistryError::FileReadFailed {
                path: entry.path().display().to_string(),
                reason: e.to_string(),
            })?;
            set.files.insert(rel, bytes);
        }
        Ok(set)
    }

    /// Replace the contents of `dir` with this set
    ///
    /// Top-level entries named in `keep` survive (the test subtree, the patch
    /// file), as do files whose bytes are unchanged. Writes are not
    /// transactional: a failure leaves a partial tree.
    pub fn replace_dir(&self, dir: &Path, keep: &[&str]) -> Result<()> {
        if dir.is_dir() {
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                let name = entry.file_name();
                if keep.iter().any(|k| name == *k) {
                    continue;
                }
                let path = entry.path();
                let is_dir = entry.file_type()?.is_dir();
                if !is_dir && self.matches_file(&name.to_string_lossy(), &path)? {
                    continue;
                }
                let removed = if is_dir {
                    fs::remove_dir_all(&path)
                } else {
                    fs::remove_file(&path)
                };
                removed.map_err(|e| RegistryError::FileWriteFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            }
        }
        self.write_into(dir)
    }

    /// Write every file below `dir`, creating parents as needed
    pub fn write_into(&self, dir: &Path) -> Result<()> {
        for (rel, bytes) in &self.files {
            let target = rel.split('/').fold(dir.to_path_buf(), |p, part| p.join(part));
            let write_failed = |e: std::io::Error| RegistryError::FileWriteFailed {
                path: target.display().to_string(),
                reason: e.to_string(),
            };
            if self.matches_file(rel, &target)? {
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(write_failed)?;
            }
            fs::write(&target, bytes).map_err(write_failed)?;
        }
        Ok(())
    }

    /// Whether `path` on disk holds exactly the bytes stored under `rel`
    fn matches_file(&self, rel: &str, path: &Path) -> Result<bool> {
        match self.files.get(rel) {
            Some(bytes) if path.is_file() => Ok(hash_file(path)? == hash_bytes(bytes)),
            _ => Ok(false),
        }
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), bytes.into());
    }

    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(path)
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Sorted union of the paths of two sets
    pub fn union_paths<'a>(&'a self, other: &'a FileSet) -> BTreeSet<&'a str> {
        self.paths().chain(other.paths()).collect()
    }

    /// Text of a file, if present and valid UTF-8
    pub fn text(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|b| std::str::from_utf8(b).ok())
    }
}

impl FromIterator<(String, Vec<u8>)> for FileSet {
    fn from_iter<I: IntoIterator<Item = (String, Vec<u8>)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

fn relative_key(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Delete `dir` and then its parent if the parent became empty
///
/// Used for two-level names (`tool/subtool`), where `tool/` must go once its
/// last child is removed. `stop_at` is never removed.
pub fn remove_dir_and_empty_parents(dir: &Path, stop_at: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(|e| RegistryError::FileWriteFailed {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;
    }

    let mut current = dir.parent();
    while let Some(parent) = current {
        if parent == stop_at || !parent.starts_with(stop_at) {
            break;
        }
        let is_empty = fs::read_dir(parent)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if !is_empty {
            break;
        }
        fs::remove_dir(parent)?;
        current = parent.parent();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_dir_skips_tests_and_excluded() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        fs::write(dir.join("main.nf"), "process X {}\n").unwrap();
        fs::write(dir.join("x.diff"), "patch").unwrap();
        fs::create_dir_all(dir.join("tests")).unwrap();
        fs::write(dir.join("tests/main.nf.test"), "test").unwrap();
        fs::create_dir_all(dir.join("templates")).unwrap();
        fs::write(dir.join("templates/run.py"), "print()").unwrap();

        let set = FileSet::read_dir(dir, &["x.diff"]).unwrap();
        let paths: Vec<&str> = set.paths().collect();
        assert_eq!(paths, vec!["main.nf", "templates/run.py"]);
    }

    #[test]
    fn test_replace_dir_keeps_listed_entries() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("fastqc");
        fs::create_dir_all(dir.join("tests")).unwrap();
        fs::write(dir.join("old.nf"), "old").unwrap();
        fs::write(dir.join("tests/keep"), "k").unwrap();

        let mut set = FileSet::new();
        set.insert("main.nf", b"new".to_vec());
        set.replace_dir(&dir, &[TESTS_DIR]).unwrap();

        assert!(!dir.join("old.nf").exists());
        assert!(dir.join("tests/keep").exists());
        assert_eq!(fs::read(dir.join("main.nf")).unwrap(), b"new");
    }

    #[test]
    fn test_unchanged_files_are_not_rewritten() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("fastqc");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("main.nf"), "same").unwrap();
        fs::write(dir.join("meta.yml"), "old").unwrap();
        let epoch = std::time::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000);
        for name in ["main.nf", "meta.yml"] {
            fs::File::options()
                .write(true)
                .open(dir.join(name))
                .unwrap()
                .set_modified(epoch)
                .unwrap();
        }

        let mut set = FileSet::new();
        set.insert("main.nf", b"same".to_vec());
        set.insert("meta.yml", b"new".to_vec());
        set.replace_dir(&dir, &[]).unwrap();

        let modified = |name: &str| fs::metadata(dir.join(name)).unwrap().modified().unwrap();
        assert_eq!(modified("main.nf"), epoch);
        assert_ne!(modified("meta.yml"), epoch);
        assert_eq!(fs::read(dir.join("meta.yml")).unwrap(), b"new");
    }

    #[test]
    fn test_bytes_are_preserved_verbatim() {
        let temp = TempDir::new().unwrap();
        let mut set = FileSet::new();
        set.insert("crlf.txt", b"a\r\nb\r\n".to_vec());
        set.insert("bin", vec![0u8, 159, 146, 150]);
        set.write_into(temp.path()).unwrap();

        let back = FileSet::read_dir(temp.path(), &[]).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_remove_dir_and_empty_parents() {
        let temp = TempDir::new().unwrap();
        let org = temp.path().join("modules/nf-core");
        fs::create_dir_all(org.join("samtools/sort")).unwrap();
        fs::create_dir_all(org.join("samtools/index")).unwrap();

        remove_dir_and_empty_parents(&org.join("samtools/sort"), &org).unwrap();
        assert!(org.join("samtools").exists(), "sibling keeps the parent");

        remove_dir_and_empty_parents(&org.join("samtools/index"), &org).unwrap();
        assert!(!org.join("samtools").exists());
        assert!(org.exists());
    }
}
