//! Location of the per-remote local mirrors
//!
//! Every remote URL gets one bare mirror under the cache root. The directory
//! name is a readable slug of the URL plus a short digest, so two URLs that
//! slug to the same text never share a mirror.

use std::path::PathBuf;

use crate::error::{RegistryError, Result};

/// Environment variable overriding the cache root
pub const CACHE_DIR_ENV: &str = "NFCOMP_CACHE_DIR";

/// Default cache directory name under the user's cache directory
const CACHE_DIR: &str = "nfcomp";

/// Subdirectory holding one mirror per remote
const REMOTES_DIR: &str = "remotes";

const PATH_UNSAFE_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', '@'];

/// Root of all remote mirrors
///
/// Uses the platform's standard cache location. Can be overridden with the
/// `NFCOMP_CACHE_DIR` environment variable.
pub fn remotes_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir).join(REMOTES_DIR));
        }
    }

    let base = dirs::cache_dir().ok_or_else(|| RegistryError::IoError {
        message: "Could not determine cache directory".to_string(),
    })?;
    Ok(base.join(CACHE_DIR).join(REMOTES_DIR))
}

/// Mirror directory of one remote
pub fn mirror_dir(url: &str) -> Result<PathBuf> {
    Ok(remotes_dir()?.join(url_slug(url)))
}

/// Path-safe directory name for a remote URL
///
/// `https://github.com/nf-core/modules.git` -> `github.com-nf-core-modules-<digest>`
pub fn url_slug(url: &str) -> String {
    let trimmed = url
        .trim_end_matches('/')
        .trim_end_matches(".git")
        .split("://")
        .last()
        .unwrap_or(url);

    let mut slug = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        let c = if PATH_UNSAFE_CHARS.contains(&c) { '-' } else { c };
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }
    let slug = slug.trim_matches('-');
    let slug = if slug.is_empty() { "remote" } else { slug };

    let digest = blake3::hash(url.as_bytes()).to_hex();
    format!("{}-{}", slug, &digest.as_str()[..8])
}
