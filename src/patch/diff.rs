//! Producing patch documents from two file sets

use std::path::Path;

use git2::{DiffOptions, Patch};

use super::document::{FileChange, FilePatch, Hunk, HunkLine, LineKind};
use crate::error::Result;
use crate::files::FileSet;
use crate::hash::hash_bytes;

const CONTEXT_LINES: u32 = 3;

/// git's heuristic: a NUL byte in the first 8000 bytes
const BINARY_PROBE_LEN: usize = 8000;

pub fn is_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(BINARY_PROBE_LEN).any(|b| *b == 0)
}

/// Diff every path of either set; `prefix` is prepended to the paths in the result
pub fn diff_sets(old: &FileSet, new: &FileSet, prefix: &str) -> Result<Vec<FilePatch>> {
    let mut files = Vec::new();
    for rel in old.union_paths(new) {
        let before = old.get(rel);
        let after = new.get(rel);
        if before == after {
            continue;
        }
        let path = if prefix.is_empty() {
            rel.to_string()
        } else {
            format!("{prefix}/{rel}")
        };
        let old_path = before.map(|_| path.clone());
        let new_path = after.map(|_| path.clone());

        let change = if before.is_some_and(is_binary) || after.is_some_and(is_binary) {
            FileChange::Binary {
                old_hash: before.map(hash_bytes),
                new_hash: after.map(hash_bytes),
            }
        } else {
            FileChange::Text(diff_text(
                before.unwrap_or_default(),
                after.unwrap_or_default(),
                &path,
            )?)
        };
        files.push(FilePatch {
            old_path,
            new_path,
            change,
        });
    }
    Ok(files)
}

/// Hunks turning `old` into `new`
pub fn diff_text(old: &[u8], new: &[u8], path: &str) -> Result<Vec<Hunk>> {
    let mut opts = DiffOptions::new();
    opts.context_lines(CONTEXT_LINES).force_text(true);
    let name = Path::new(path);
    let patch = Patch::from_buffers(old, Some(name), new, Some(name), Some(&mut opts))?;

    let mut hunks = Vec::with_capacity(patch.num_hunks());
    for h in 0..patch.num_hunks() {
        let (raw, line_count) = patch.hunk(h)?;
        let section = section_text(raw.header());
        let mut hunk = Hunk {
            old_start: raw.old_start() as usize,
            old_len: raw.old_lines() as usize,
            new_start: raw.new_start() as usize,
            new_len: raw.new_lines() as usize,
            section,
            lines: Vec::with_capacity(line_count),
        };
        for l in 0..line_count {
            let line = patch.line_in_hunk(h, l)?;
            let kind = match line.origin() {
                ' ' => LineKind::Context,
                '-' => LineKind::Removed,
                '+' => LineKind::Added,
                // end-of-file newline markers; covered by `no_newline` below
                _ => continue,
            };
            let content = line.content();
            let (content, no_newline) = match content.strip_suffix(b"\n") {
                Some(stripped) => (stripped, false),
                None => (content, true),
            };
            hunk.lines.push(HunkLine {
                kind,
                content: content.to_vec(),
                no_newline,
            });
        }
        hunks.push(hunk);
    }
    Ok(hunks)
}

/// Text after the closing `@@` of a hunk header, leading space kept
fn section_text(header: &[u8]) -> String {
    let text = String::from_utf8_lossy(header);
    let text = text.trim_end_matches(['\r', '\n']);
    text.get(2..)
        .and_then(|rest| rest.find("@@").map(|i| rest[i + 2..].to_string()))
        .unwrap_or_default()
}
