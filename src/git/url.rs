//! Remote URL handling
//!
//! Manifest keys keep the URL exactly as the user gave it; only the URL
//! handed to libgit2 is normalised.

use std::borrow::Cow;

/// Rewrite a remote URL into a form libgit2 accepts
///
/// - SCP-style SSH (`git@host:org/repo.git`) becomes `ssh://git@host/org/repo.git`
/// - `file://relative` and backslash paths become `file:///...`
pub fn for_libgit2(url: &str) -> Cow<'_, str> {
    if let Some(rest) = url.strip_prefix("git@") {
        return match rest.split_once(':') {
            Some((host, path)) => {
                let path = path.trim_start_matches('/');
                Cow::Owned(format!("ssh://git@{host}/{path}"))
            }
            None => Cow::Borrowed(url),
        };
    }

    if let Some(after) = url.strip_prefix("file://") {
        if after.contains('\\') {
            return Cow::Owned(format!(
                "file:///{}",
                after.replace('\\', "/").trim_start_matches('/')
            ));
        }
        if !after.is_empty() && !after.starts_with('/') {
            return Cow::Owned(format!("file:///{after}"));
        }
    }

    Cow::Borrowed(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scp_style_ssh() {
        assert_eq!(
            for_libgit2("git@github.com:nf-core/modules.git"),
            "ssh://git@github.com/nf-core/modules.git"
        );
        assert_eq!(
            for_libgit2("git@github.com:/abs/modules.git"),
            "ssh://git@github.com/abs/modules.git"
        );
    }

    #[test]
    fn test_https_unchanged() {
        let url = "https://github.com/nf-core/modules.git";
        assert!(matches!(for_libgit2(url), Cow::Borrowed(_)));
    }

    #[test]
    fn test_file_urls() {
        assert_eq!(for_libgit2("file://tmp/remote"), "file:///tmp/remote");
        assert_eq!(for_libgit2("file:///tmp/remote"), "file:///tmp/remote");
    }
}
