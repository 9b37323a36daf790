//! Applying patch documents to in-memory file sets
//!
//! Hunks need exact context. A hunk that is not at its recorded line is
//! searched for above and below it; the first match closest to the expected
//! position wins. No fuzz.
//!
//! Binary changes carry hashes only. A binary file matching either side is
//! left as it is; anything else is a conflict.

use std::fmt::Write as _;

use super::document::{FileChange, FilePatch, Hunk, HunkLine, PatchDocument};
use crate::files::FileSet;
use crate::hash::hash_bytes;

/// One part of a document that did not apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub path: String,
    /// Hunk header, or `None` for a whole-file failure
    pub hunk: Option<String>,
    pub reason: String,
    /// Lines the hunk expected to find
    pub expected: Vec<String>,
}

/// Every failure of one application attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictReport {
    pub failures: Vec<Failure>,
}

impl ConflictReport {
    /// Paths with at least one failure, deduplicated
    pub fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.failures.iter().map(|f| f.path.clone()).collect();
        files.dedup();
        files
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for failure in &self.failures {
            match &failure.hunk {
                Some(hunk) => {
                    let _ = writeln!(out, "{}: hunk {} {}", failure.path, hunk, failure.reason);
                }
                None => {
                    let _ = writeln!(out, "{}: {}", failure.path, failure.reason);
                }
            }
            for line in &failure.expected {
                let _ = writeln!(out, "    | {line}");
            }
        }
        out
    }
}

/// Apply `doc` to `target`; file paths are taken relative to `prefix`
///
/// Nothing is returned unless every file applies.
pub fn apply(doc: &PatchDocument, target: &FileSet, prefix: &str) -> Result<FileSet, ConflictReport> {
    let mut result = target.clone();
    let mut report = ConflictReport::default();

    for file in &doc.files {
        let display = file.path().to_string();
        let rel = strip_prefix(file.path(), prefix);
        let fail = |reason: &str| Failure {
            path: display.clone(),
            hunk: None,
            reason: reason.to_string(),
            expected: Vec::new(),
        };

        match &file.change {
            FileChange::Binary { old_hash, new_hash } => {
                let current = target.get(rel).map(hash_bytes);
                if current != *old_hash && current != *new_hash {
                    report.failures.push(fail("binary file matches neither side of the patch"));
                }
            }
            FileChange::Text(hunks) => match apply_file(file, hunks, target.get(rel)) {
                Ok(Some(bytes)) => result.insert(rel, bytes),
                Ok(None) => {
                    result.remove(rel);
                }
                Err(FileError::Whole(reason)) => report.failures.push(fail(&reason)),
                Err(FileError::Hunks(failures)) => report.failures.extend(failures.into_iter().map(
                    |(hunk, expected)| Failure {
                        path: display.clone(),
                        hunk: Some(hunk),
                        reason: "does not match".to_string(),
                        expected,
                    },
                )),
            },
        }
    }

    if report.failures.is_empty() {
        Ok(result)
    } else {
        Err(report)
    }
}

/// Copy binary files the patch changed from `installed` into `result`
///
/// Applies where `result` still holds the old side and `installed` the new side.
pub fn carry_binaries(doc: &PatchDocument, installed: &FileSet, result: &mut FileSet, prefix: &str) {
    for file in &doc.files {
        let FileChange::Binary { old_hash, new_hash } = &file.change else {
            continue;
        };
        let rel = strip_prefix(file.path(), prefix);
        if result.get(rel).map(hash_bytes) != *old_hash || installed.get(rel).map(hash_bytes) != *new_hash {
            continue;
        }
        match installed.get(rel) {
            Some(bytes) => result.insert(rel, bytes.to_vec()),
            None => {
                result.remove(rel);
            }
        }
    }
}

pub(crate) fn strip_prefix<'p>(path: &'p str, prefix: &str) -> &'p str {
    if prefix.is_empty() {
        return path;
    }
    path.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
}

enum FileError {
    Whole(String),
    Hunks(Vec<(String, Vec<String>)>),
}

/// New content of one file, `None` when the patch deletes it
fn apply_file(file: &FilePatch, hunks: &[Hunk], current: Option<&[u8]>) -> Result<Option<Vec<u8>>, FileError> {
    if file.is_created() {
        let created = join(hunks.iter().flat_map(|h| h.new_lines()));
        return match current {
            None => Ok(Some(created)),
            Some(existing) if existing == created.as_slice() => Ok(Some(created)),
            Some(_) => Err(FileError::Whole("already exists with different content".into())),
        };
    }

    let Some(current) = current else {
        return Err(FileError::Whole("does not exist".into()));
    };

    if file.is_deleted() {
        let expected = join(hunks.iter().flat_map(|h| h.old_lines()));
        return if current == expected.as_slice() {
            Ok(None)
        } else {
            Err(FileError::Whole("content differs from the file the patch deletes".into()))
        };
    }

    let lines: Vec<&[u8]> = current.split_inclusive(|b| *b == b'\n').collect();
    let mut out: Vec<u8> = Vec::with_capacity(current.len());
    let mut failures = Vec::new();
    let mut consumed = 0usize;
    let mut drift: isize = 0;

    for hunk in hunks {
        let old: Vec<Vec<u8>> = hunk.old_lines().map(HunkLine::file_bytes).collect();
        // a pure insertion after line N records old_start = N
        let recorded = if old.is_empty() {
            hunk.old_start as isize
        } else {
            hunk.old_start.max(1) as isize - 1
        };

        match locate(&lines, &old, recorded + drift, consumed) {
            Some(at) => {
                drift = at as isize - recorded;
                for line in &lines[consumed..at] {
                    out.extend_from_slice(line);
                }
                for line in hunk.new_lines() {
                    out.extend_from_slice(&line.file_bytes());
                }
                consumed = at + old.len();
            }
            None => failures.push((
                hunk.header(),
                old.iter()
                    .map(|l| String::from_utf8_lossy(l).trim_end_matches('\n').to_string())
                    .collect(),
            )),
        }
    }

    if !failures.is_empty() {
        return Err(FileError::Hunks(failures));
    }
    for line in &lines[consumed..] {
        out.extend_from_slice(line);
    }
    Ok(Some(out))
}

/// First position at or after `floor` where `needle` matches, nearest `expected` first
fn locate(lines: &[&[u8]], needle: &[Vec<u8>], expected: isize, floor: usize) -> Option<usize> {
    if needle.len() > lines.len() {
        return None;
    }
    let last = (lines.len() - needle.len()) as isize;
    let floor = floor as isize;
    if floor > last {
        return None;
    }
    let matches_at = |at: isize| {
        at >= floor
            && at <= last
            && needle
                .iter()
                .zip(&lines[at as usize..])
                .all(|(want, have)| want.as_slice() == *have)
    };

    let expected = expected.clamp(floor, last);
    let span = (expected - floor).max(last - expected);
    for distance in 0..=span {
        if matches_at(expected - distance) {
            return Some((expected - distance) as usize);
        }
        if distance > 0 && matches_at(expected + distance) {
            return Some((expected + distance) as usize);
        }
    }
    None
}

fn join<'a>(lines: impl Iterator<Item = &'a HunkLine>) -> Vec<u8> {
    lines.flat_map(HunkLine::file_bytes).collect()
}
