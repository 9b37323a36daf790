//! Classification of libgit2 failures
//!
//! Clone and fetch failures are reduced to the three remote failure modes a
//! user can act on; everything else keeps libgit2's own message.

use git2::{Error, ErrorClass, ErrorCode};

use crate::error::RegistryError;

/// What went wrong talking to a remote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFailure {
    NotFound,
    AuthRequired,
    NetworkUnreachable,
    Other,
}

type FailureCheck = fn(&str, &Error) -> bool;

const CLASSIFICATIONS: &[(FailureCheck, RemoteFailure)] = &[
    (
        |msg, err| {
            err.code() == ErrorCode::NotFound
                || msg.contains("not found")
                || msg.contains("404")
                || msg.contains("does not exist")
                || msg.contains("could not find repository")
        },
        RemoteFailure::NotFound,
    ),
    (
        |msg, err| {
            err.code() == ErrorCode::Auth
                || msg.contains("authentication")
                || msg.contains("credentials")
                || msg.contains("permission denied")
                || msg.contains("401")
                || msg.contains("403")
        },
        RemoteFailure::AuthRequired,
    ),
    (
        |msg, err| {
            matches!(err.class(), ErrorClass::Net | ErrorClass::Ssl)
                || msg.contains("connection")
                || msg.contains("network")
                || msg.contains("resolve")
                || msg.contains("timed out")
                || msg.contains("certificate")
        },
        RemoteFailure::NetworkUnreachable,
    ),
];

/// Classify a clone / fetch error
pub fn classify(err: &Error) -> RemoteFailure {
    let msg = err.message().to_lowercase();
    CLASSIFICATIONS
        .iter()
        .find(|(check, _)| check(&msg, err))
        .map(|(_, failure)| *failure)
        .unwrap_or(RemoteFailure::Other)
}

/// Human readable reason for a clone / fetch error
pub fn interpret_git_error(err: &Error) -> String {
    match classify(err) {
        RemoteFailure::NotFound => "repository not found".to_string(),
        RemoteFailure::AuthRequired => "authentication required".to_string(),
        RemoteFailure::NetworkUnreachable => format!("network unreachable ({})", err.message()),
        RemoteFailure::Other => err.message().to_string(),
    }
}

/// Error for a failed clone or fetch of `url`
pub fn unreachable(url: &str, err: &Error) -> RegistryError {
    RegistryError::RegistryUnreachable {
        url: url.to_string(),
        reason: interpret_git_error(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found() {
        let err = Error::from_str("remote repository not found");
        assert_eq!(classify(&err), RemoteFailure::NotFound);
        assert_eq!(interpret_git_error(&err), "repository not found");
    }

    #[test]
    fn test_auth() {
        let err = Error::new(ErrorCode::Auth, ErrorClass::Http, "too many redirects");
        assert_eq!(classify(&err), RemoteFailure::AuthRequired);
    }

    #[test]
    fn test_network() {
        let err = Error::new(
            ErrorCode::GenericError,
            ErrorClass::Net,
            "failed to connect to github.com",
        );
        assert_eq!(classify(&err), RemoteFailure::NetworkUnreachable);
        assert!(matches!(
            unreachable("https://x", &err),
            RegistryError::RegistryUnreachable { .. }
        ));
    }

    #[test]
    fn test_other_keeps_message() {
        let err = Error::from_str("object is corrupt");
        assert_eq!(interpret_git_error(&err), "object is corrupt");
    }
}
