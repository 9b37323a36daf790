//! Unified diff documents
//!
//! A patch document is a header line followed by one section per changed
//! file. Lines are kept as raw bytes so CRLF files and non-UTF-8 text survive
//! a parse / render cycle unchanged.
//!
//! Rendered form:
//!
//! ```text
//! Changes in component 'nf-core/bismark/align'
//! diff --git a/modules/nf-core/bismark/align/main.nf b/modules/nf-core/bismark/align/main.nf
//! --- a/modules/nf-core/bismark/align/main.nf
//! +++ b/modules/nf-core/bismark/align/main.nf
//! @@ -1,5 +1,5 @@
//! ```
//!
//! Documents without `diff --git` lines (plain `---` / `+++` sections with
//! arbitrary text between them) are accepted when parsing.

use crate::error::{RegistryError, Result};

/// Path shown for the missing side of a created or deleted file
pub const DEV_NULL: &str = "/dev/null";

const NO_NEWLINE_MARKER: &[u8] = b"\\ No newline at end of file";

/// Kind of a line inside a hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Context,
    Removed,
    Added,
}

impl LineKind {
    fn prefix(self) -> u8 {
        match self {
            LineKind::Context => b' ',
            LineKind::Removed => b'-',
            LineKind::Added => b'+',
        }
    }
}

/// One line of a hunk, without its line terminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkLine {
    pub kind: LineKind,
    pub content: Vec<u8>,
    /// The line is the last of its file and has no trailing newline
    pub no_newline: bool,
}

impl HunkLine {
    /// The line as it appears in the file, terminator included
    pub fn file_bytes(&self) -> Vec<u8> {
        let mut bytes = self.content.clone();
        if !self.no_newline {
            bytes.push(b'\n');
        }
        bytes
    }
}

/// One hunk of a text diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
    /// Text after the closing `@@`, if any
    pub section: String,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    /// Lines the hunk expects in the file it applies to
    pub fn old_lines(&self) -> impl Iterator<Item = &HunkLine> {
        self.lines.iter().filter(|l| l.kind != LineKind::Added)
    }

    /// Lines the hunk leaves behind
    pub fn new_lines(&self) -> impl Iterator<Item = &HunkLine> {
        self.lines.iter().filter(|l| l.kind != LineKind::Removed)
    }

    /// `@@ -a,b +c,d @@`
    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@{}",
            self.old_start, self.old_len, self.new_start, self.new_len, self.section
        )
    }

    fn reversed(&self) -> Hunk {
        Hunk {
            old_start: self.new_start,
            old_len: self.new_len,
            new_start: self.old_start,
            new_len: self.old_len,
            section: self.section.clone(),
            lines: self
                .lines
                .iter()
                .map(|l| HunkLine {
                    kind: match l.kind {
                        LineKind::Added => LineKind::Removed,
                        LineKind::Removed => LineKind::Added,
                        LineKind::Context => LineKind::Context,
                    },
                    content: l.content.clone(),
                    no_newline: l.no_newline,
                })
                .collect(),
        }
    }
}

/// Change to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Text(Vec<Hunk>),
    /// Binary content, identified by digest on each side
    Binary {
        old_hash: Option<String>,
        new_hash: Option<String>,
    },
}

/// Section of a document for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    /// Project-relative path before the change; `None` for a created file
    pub old_path: Option<String>,
    /// Project-relative path after the change; `None` for a deleted file
    pub new_path: Option<String>,
    pub change: FileChange,
}

impl FilePatch {
    /// The path this section is about
    pub fn path(&self) -> &str {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .unwrap_or(DEV_NULL)
    }

    pub fn is_created(&self) -> bool {
        self.old_path.is_none()
    }

    pub fn is_deleted(&self) -> bool {
        self.new_path.is_none()
    }

    fn reversed(&self) -> FilePatch {
        FilePatch {
            old_path: self.new_path.clone(),
            new_path: self.old_path.clone(),
            change: match &self.change {
                FileChange::Text(hunks) => FileChange::Text(hunks.iter().map(Hunk::reversed).collect()),
                FileChange::Binary { old_hash, new_hash } => FileChange::Binary {
                    old_hash: new_hash.clone(),
                    new_hash: old_hash.clone(),
                },
            },
        }
    }
}

/// A whole patch document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchDocument {
    pub header: Option<String>,
    pub files: Vec<FilePatch>,
}

impl PatchDocument {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Paths of every file the document touches
    pub fn paths(&self) -> Vec<&str> {
        self.files.iter().map(FilePatch::path).collect()
    }

    /// The inverse document: applying it undoes this one
    pub fn reversed(&self) -> PatchDocument {
        PatchDocument {
            header: self.header.clone(),
            files: self.files.iter().map(FilePatch::reversed).collect(),
        }
    }

    /// Render to bytes; an empty document renders to nothing
    pub fn render(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if self.files.is_empty() {
            return out;
        }
        if let Some(header) = &self.header {
            out.extend_from_slice(header.as_bytes());
            out.push(b'\n');
        }
        for file in &self.files {
            render_file(file, &mut out);
        }
        out
    }

    /// Render for display; invalid UTF-8 is replaced
    pub fn render_lossy(&self) -> String {
        String::from_utf8_lossy(&self.render()).into_owned()
    }

    /// Parse a document, git-style or legacy
    pub fn parse(input: &[u8]) -> Result<Self> {
        Parser::new(input).parse()
    }
}

fn render_file(file: &FilePatch, out: &mut Vec<u8>) {
    let a = file.old_path.as_deref().or(file.new_path.as_deref()).unwrap_or(DEV_NULL);
    let b = file.new_path.as_deref().or(file.old_path.as_deref()).unwrap_or(DEV_NULL);
    push_line(out, format!("diff --git a/{a} b/{b}").as_bytes());

    match &file.change {
        FileChange::Binary { old_hash, new_hash } => {
            push_line(
                out,
                format!(
                    "index {}..{}",
                    old_hash.as_deref().unwrap_or("0"),
                    new_hash.as_deref().unwrap_or("0")
                )
                .as_bytes(),
            );
            let from = file.old_path.as_ref().map_or(DEV_NULL.to_string(), |p| format!("a/{p}"));
            let to = file.new_path.as_ref().map_or(DEV_NULL.to_string(), |p| format!("b/{p}"));
            push_line(out, format!("Binary files {from} and {to} differ").as_bytes());
        }
        FileChange::Text(hunks) => {
            let from = file.old_path.as_ref().map_or(DEV_NULL.to_string(), |p| format!("a/{p}"));
            let to = file.new_path.as_ref().map_or(DEV_NULL.to_string(), |p| format!("b/{p}"));
            push_line(out, format!("--- {from}").as_bytes());
            push_line(out, format!("+++ {to}").as_bytes());
            for hunk in hunks {
                push_line(out, hunk.header().as_bytes());
                for line in &hunk.lines {
                    out.push(line.kind.prefix());
                    out.extend_from_slice(&line.content);
                    out.push(b'\n');
                    if line.no_newline {
                        push_line(out, NO_NEWLINE_MARKER);
                    }
                }
            }
        }
    }
}

fn push_line(out: &mut Vec<u8>, line: &[u8]) {
    out.extend_from_slice(line);
    out.push(b'\n');
}

/// Path from a `---` / `+++` line: drop the `a/` or `b/` prefix and any timestamp
fn header_path(raw: &[u8], prefix: &str) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let text = text.split('\t').next().unwrap_or_default().trim_end_matches('\r').trim();
    if text == DEV_NULL {
        return None;
    }
    Some(text.strip_prefix(prefix).unwrap_or(text).to_string())
}

fn parse_range(text: &str) -> Option<(usize, usize)> {
    match text.split_once(',') {
        Some((start, len)) => Some((start.parse().ok()?, len.parse().ok()?)),
        None => Some((text.parse().ok()?, 1)),
    }
}

/// `@@ -a[,b] +c[,d] @@[ section]`
fn parse_hunk_header(line: &[u8]) -> Option<(usize, usize, usize, usize, String)> {
    let text = String::from_utf8_lossy(line);
    let rest = text.strip_prefix("@@ ")?;
    let (ranges, section) = rest.split_once(" @@")?;
    let (old, new) = ranges.split_once(' ')?;
    let (old_start, old_len) = parse_range(old.strip_prefix('-')?)?;
    let (new_start, new_len) = parse_range(new.strip_prefix('+')?)?;
    let section = section.trim_end_matches(['\r', '\n']).to_string();
    Some((old_start, old_len, new_start, new_len, section))
}

fn strip_eol(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\n").unwrap_or(line)
}

struct Parser<'a> {
    lines: Vec<&'a [u8]>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a [u8]) -> Self {
        let mut lines: Vec<&[u8]> = input.split_inclusive(|b| *b == b'\n').collect();
        if lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        Self { lines, pos: 0 }
    }

    fn invalid(&self, reason: impl Into<String>) -> RegistryError {
        RegistryError::PatchInvalid {
            path: String::new(),
            reason: format!("line {}: {}", self.pos + 1, reason.into()),
        }
    }

    fn peek(&self) -> Option<&'a [u8]> {
        self.lines.get(self.pos).map(|l| strip_eol(l))
    }

    fn parse(mut self) -> Result<PatchDocument> {
        let mut doc = PatchDocument::default();
        let mut pending_git: Option<(String, String)> = None;

        while let Some(line) = self.peek() {
            if line.starts_with(b"diff --git ") {
                pending_git = parse_git_line(line);
                self.pos += 1;
            } else if line.starts_with(b"--- ") {
                let file = self.parse_text_file(line)?;
                pending_git = None;
                doc.files.push(file);
            } else if line.starts_with(b"Binary files ") {
                let file = self.parse_binary_file(pending_git.take())?;
                doc.files.push(file);
            } else if line.starts_with(b"index ") && pending_git.is_some() {
                let next = self.lines.get(self.pos + 1).map(|l| strip_eol(l));
                if next.is_some_and(|n| n.starts_with(b"Binary files ")) {
                    let file = self.parse_binary_file(pending_git.take())?;
                    doc.files.push(file);
                } else {
                    self.pos += 1;
                }
            } else {
                if doc.header.is_none() && doc.files.is_empty() && pending_git.is_none() {
                    let text = String::from_utf8_lossy(line).trim_end_matches('\r').to_string();
                    if !text.trim().is_empty() {
                        doc.header = Some(text);
                    }
                }
                self.pos += 1;
            }
        }
        Ok(doc)
    }

    fn parse_text_file(&mut self, minus_line: &[u8]) -> Result<FilePatch> {
        let old_path = header_path(&minus_line[4..], "a/");
        self.pos += 1;
        let plus_line = self
            .peek()
            .filter(|l| l.starts_with(b"+++ "))
            .ok_or_else(|| self.invalid("expected '+++' after '---'"))?;
        let new_path = header_path(&plus_line[4..], "b/");
        self.pos += 1;
        if old_path.is_none() && new_path.is_none() {
            return Err(self.invalid("both sides of a file are /dev/null"));
        }

        let mut hunks = Vec::new();
        while let Some(line) = self.peek() {
            if !line.starts_with(b"@@ ") {
                break;
            }
            hunks.push(self.parse_hunk(line)?);
        }
        Ok(FilePatch {
            old_path,
            new_path,
            change: FileChange::Text(hunks),
        })
    }

    fn parse_hunk(&mut self, header: &[u8]) -> Result<Hunk> {
        let (old_start, old_len, new_start, new_len, section) =
            parse_hunk_header(header).ok_or_else(|| self.invalid("malformed hunk header"))?;
        self.pos += 1;

        let mut lines: Vec<HunkLine> = Vec::new();
        let (mut old_seen, mut new_seen) = (0usize, 0usize);
        while old_seen < old_len || new_seen < new_len {
            let raw = self
                .peek()
                .ok_or_else(|| self.invalid("hunk ends before its line counts are reached"))?;
            let (kind, content) = match raw.first() {
                Some(b' ') => (LineKind::Context, &raw[1..]),
                Some(b'-') => (LineKind::Removed, &raw[1..]),
                Some(b'+') => (LineKind::Added, &raw[1..]),
                // Editors strip the single space of empty context lines
                None => (LineKind::Context, raw),
                Some(b'\\') => {
                    self.mark_no_newline(&mut lines);
                    continue;
                }
                Some(_) => return Err(self.invalid("unexpected line inside a hunk")),
            };
            match kind {
                LineKind::Context => {
                    old_seen += 1;
                    new_seen += 1;
                }
                LineKind::Removed => old_seen += 1,
                LineKind::Added => new_seen += 1,
            }
            lines.push(HunkLine {
                kind,
                content: content.to_vec(),
                no_newline: false,
            });
            self.pos += 1;
        }
        if old_seen != old_len || new_seen != new_len {
            return Err(self.invalid("hunk line counts do not match its header"));
        }
        if self.peek().is_some_and(|l| l.starts_with(b"\\")) {
            self.mark_no_newline(&mut lines);
        }

        Ok(Hunk {
            old_start,
            old_len,
            new_start,
            new_len,
            section,
            lines,
        })
    }

    fn mark_no_newline(&mut self, lines: &mut [HunkLine]) {
        if let Some(last) = lines.last_mut() {
            last.no_newline = true;
        }
        self.pos += 1;
    }

    fn parse_binary_file(&mut self, git_paths: Option<(String, String)>) -> Result<FilePatch> {
        let (mut old_hash, mut new_hash) = (None, None);
        if let Some(line) = self.peek().filter(|l| l.starts_with(b"index ")) {
            let text = String::from_utf8_lossy(&line[6..]).trim().to_string();
            if let Some((old, new)) = text.split_once("..") {
                old_hash = (old != "0").then(|| old.to_string());
                new_hash = (new != "0").then(|| new.to_string());
            }
            self.pos += 1;
        }
        let line = self
            .peek()
            .ok_or_else(|| self.invalid("expected 'Binary files' line"))?;
        let text = String::from_utf8_lossy(line).to_string();
        self.pos += 1;

        let (a, b) = git_paths
            .or_else(|| parse_binary_line(&text))
            .ok_or_else(|| self.invalid("cannot determine binary file paths"))?;
        let old_path = old_hash.as_ref().map(|_| a.clone());
        let new_path = new_hash.as_ref().map(|_| b.clone());
        let (old_path, new_path) = if old_path.is_none() && new_path.is_none() {
            (Some(a), Some(b))
        } else {
            (old_path, new_path)
        };
        Ok(FilePatch {
            old_path,
            new_path,
            change: FileChange::Binary { old_hash, new_hash },
        })
    }
}

/// `diff --git a/X b/Y` -> (X, Y)
fn parse_git_line(line: &[u8]) -> Option<(String, String)> {
    let text = String::from_utf8_lossy(&line[11..]).trim_end_matches('\r').to_string();
    let rest = text.strip_prefix("a/")?;
    let (a, b) = rest.split_once(" b/")?;
    Some((a.to_string(), b.to_string()))
}

/// `Binary files a/X and b/Y differ` -> (X, Y)
fn parse_binary_line(text: &str) -> Option<(String, String)> {
    let rest = text.strip_prefix("Binary files ")?.strip_suffix(" differ")?;
    let (a, b) = rest.split_once(" and ")?;
    let a = a.strip_prefix("a/").unwrap_or(a);
    let b = b.strip_prefix("b/").unwrap_or(b);
    Some((a.to_string(), b.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIT_STYLE: &str = "Changes in component 'nf-core/fastqc'
diff --git a/modules/nf-core/fastqc/main.nf b/modules/nf-core/fastqc/main.nf
--- a/modules/nf-core/fastqc/main.nf
+++ b/modules/nf-core/fastqc/main.nf
@@ -1,3 +1,3 @@
 process FASTQC {
-    label 'process_medium'
+    label 'process_high'
 }
";

    #[test]
    fn test_parse_git_style() {
        let doc = PatchDocument::parse(GIT_STYLE.as_bytes()).unwrap();
        assert_eq!(doc.header.as_deref(), Some("Changes in component 'nf-core/fastqc'"));
        assert_eq!(doc.files.len(), 1);
        let file = &doc.files[0];
        assert_eq!(file.path(), "modules/nf-core/fastqc/main.nf");
        let FileChange::Text(hunks) = &file.change else {
            panic!("expected text change");
        };
        assert_eq!(hunks[0].lines.len(), 4);
        assert_eq!(hunks[0].old_lines().count(), 3);
    }

    #[test]
    fn test_render_round_trip() {
        let doc = PatchDocument::parse(GIT_STYLE.as_bytes()).unwrap();
        assert_eq!(doc.render(), GIT_STYLE.as_bytes());
    }

    #[test]
    fn test_parse_legacy_without_git_headers() {
        let legacy = "Changes in module 'nf-core/fastqc'
'modules/nf-core/fastqc/meta.yml' is unchanged
Changes in 'fastqc/main.nf':
--- modules/nf-core/fastqc/main.nf
+++ modules/nf-core/fastqc/main.nf
@@ -1,3 +1,3 @@
 process FASTQC {
-    label 'process_medium'
+    label 'process_high'
 }

************************************************************
";
        let doc = PatchDocument::parse(legacy.as_bytes()).unwrap();
        assert_eq!(doc.header.as_deref(), Some("Changes in module 'nf-core/fastqc'"));
        assert_eq!(doc.paths(), vec!["modules/nf-core/fastqc/main.nf"]);
    }

    #[test]
    fn test_removed_line_that_looks_like_a_header() {
        let doc = "--- a/x/main.nf
+++ b/x/main.nf
@@ -1,2 +1,1 @@
--- not a header
 keep
";
        let doc = PatchDocument::parse(doc.as_bytes()).unwrap();
        let FileChange::Text(hunks) = &doc.files[0].change else {
            panic!("expected text change");
        };
        assert_eq!(hunks[0].lines[0].kind, LineKind::Removed);
        assert_eq!(hunks[0].lines[0].content, b"-- not a header");
    }

    #[test]
    fn test_no_newline_marker() {
        let doc = "--- a/f
+++ b/f
@@ -1 +1 @@
-old
\\ No newline at end of file
+new
\\ No newline at end of file
";
        let parsed = PatchDocument::parse(doc.as_bytes()).unwrap();
        let FileChange::Text(hunks) = &parsed.files[0].change else {
            panic!("expected text change");
        };
        assert!(hunks[0].lines.iter().all(|l| l.no_newline));
        assert_eq!(parsed.render(), doc.as_bytes());
    }

    #[test]
    fn test_created_and_deleted_files() {
        let doc = "diff --git a/m/new.txt b/m/new.txt
--- /dev/null
+++ b/m/new.txt
@@ -0,0 +1,1 @@
+hello
diff --git a/m/old.txt b/m/old.txt
--- a/m/old.txt
+++ /dev/null
@@ -1,1 +0,0 @@
-bye
";
        let parsed = PatchDocument::parse(doc.as_bytes()).unwrap();
        assert!(parsed.files[0].is_created());
        assert!(parsed.files[1].is_deleted());
        let reversed = parsed.reversed();
        assert!(reversed.files[0].is_deleted());
        assert!(reversed.files[1].is_created());
    }

    #[test]
    fn test_binary_section() {
        let doc = "diff --git a/m/logo.png b/m/logo.png
index blake3:aaa..blake3:bbb
Binary files a/m/logo.png and b/m/logo.png differ
";
        let parsed = PatchDocument::parse(doc.as_bytes()).unwrap();
        assert_eq!(
            parsed.files[0].change,
            FileChange::Binary {
                old_hash: Some("blake3:aaa".into()),
                new_hash: Some("blake3:bbb".into())
            }
        );
        assert_eq!(parsed.render(), doc.as_bytes());
    }

    #[test]
    fn test_truncated_hunk_is_invalid() {
        let doc = "--- a/f\n+++ b/f\n@@ -1,3 +1,3 @@\n a\n";
        assert!(matches!(
            PatchDocument::parse(doc.as_bytes()),
            Err(RegistryError::PatchInvalid { .. })
        ));
    }
}
