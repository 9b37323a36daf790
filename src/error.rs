//! Error types and handling for nfcomp
//!
//! Uses `thiserror` for error definitions and `miette` for diagnostics.
//! Every variant maps onto one of the process exit codes:
//!
//! - `1` user error (unknown component, bad revision, refused confirmation)
//! - `2` environment error (not a pipeline, config invalid)
//! - `3` network / remote error
//! - `4` manifest invariant violation

use miette::Diagnostic;
use thiserror::Error;

/// Exit code for user errors
pub const EXIT_USER: i32 = 1;

/// Exit code for environment errors
pub const EXIT_ENVIRONMENT: i32 = 2;

/// Exit code for network and remote errors
pub const EXIT_REMOTE: i32 = 3;

/// Exit code for manifest invariant violations
pub const EXIT_MANIFEST: i32 = 4;

/// Main error type for nfcomp operations
#[derive(Error, Diagnostic, Debug)]
pub enum RegistryError {
    // Project errors
    #[error("Could not find a 'main.nf' or 'nextflow.config' file in '{path}'")]
    #[diagnostic(
        code(nfcomp::project::not_a_pipeline),
        help("Run the command from the root of a pipeline or pass it with --dir")
    )]
    NotAPipeline { path: String },

    #[error("Cannot {action} components in a repository of type 'modules'")]
    #[diagnostic(
        code(nfcomp::project::producer_repository),
        help("Set 'repository_type: pipeline' in .nf-core.yml if this is a pipeline")
    )]
    ProducerRepository { action: String },

    #[error("Invalid configuration in '{path}': {reason}")]
    #[diagnostic(code(nfcomp::config::invalid))]
    ConfigInvalid { path: String, reason: String },

    // Remote errors
    #[error("Remote '{url}' is unreachable: {reason}")]
    #[diagnostic(
        code(nfcomp::remote::unreachable),
        help("Check the URL, your network connection and your git credentials")
    )]
    RegistryUnreachable { url: String, reason: String },

    #[error("Remote '{url}' does not look like a component repository: {reason}")]
    #[diagnostic(
        code(nfcomp::remote::layout_invalid),
        help("The remote must contain 'modules/<org_path>/' or 'subworkflows/<org_path>/'")
    )]
    LayoutInvalid { url: String, reason: String },

    #[error("Branch '{branch}' does not exist in '{url}'")]
    #[diagnostic(code(nfcomp::remote::branch_unknown))]
    BranchUnknown { url: String, branch: String },

    #[error("Revision '{revision}' is not a valid commit of '{url}'")]
    #[diagnostic(code(nfcomp::remote::revision_unknown))]
    RevisionUnknown { url: String, revision: String },

    #[error("{kind} '{name}' not found {location}")]
    #[diagnostic(
        code(nfcomp::component::unknown),
        help("Check the component name, the remote (--git-remote) and the branch (--branch)")
    )]
    ComponentUnknown {
        kind: String,
        name: String,
        location: String,
    },

    #[error(
        "Remote '{url}' uses the organisation path '{org}', which is already used by '{existing}'"
    )]
    #[diagnostic(
        code(nfcomp::remote::org_path_conflict),
        help("Components from different remotes must be installed under different org_path values")
    )]
    OrgPathConflict {
        url: String,
        org: String,
        existing: String,
    },

    #[error("Git operation failed: {message}")]
    #[diagnostic(code(nfcomp::git::operation_failed))]
    GitOperationFailed { message: String },

    // Manifest errors
    #[error("Manifest '{path}' is invalid: {reason}")]
    #[diagnostic(
        code(nfcomp::manifest::invalid),
        help("Remove the file and rerun the command to rebuild it from the installed components")
    )]
    ManifestInvalid { path: String, reason: String },

    #[error("Manifest invariant violated: {reason}")]
    #[diagnostic(
        code(nfcomp::manifest::invariant_violation),
        help("The previous manifest was left untouched")
    )]
    ManifestInvariantViolation { reason: String },

    // Patch errors
    #[error("Patch for '{component}' does not apply to {revision}: {}", .files.join(", "))]
    #[diagnostic(
        code(nfcomp::patch::conflict),
        help("Update without the patch, then reapply your changes and run the patch command again")
    )]
    PatchConflict {
        component: String,
        revision: String,
        files: Vec<String>,
        report: String,
    },

    #[error("Patch file '{path}' could not be parsed: {reason}")]
    #[diagnostic(code(nfcomp::patch::invalid))]
    PatchInvalid { path: String, reason: String },

    #[error("{kind} '{name}' is unchanged, there is no patch to compute")]
    #[diagnostic(code(nfcomp::patch::unchanged))]
    ComponentUnchanged { kind: String, name: String },

    // Interaction errors
    #[error("Refused to {action}")]
    #[diagnostic(code(nfcomp::ui::refused))]
    Refused { action: String },

    #[error("{} component(s) failed", .failures.len())]
    #[diagnostic(code(nfcomp::summary::failures))]
    ComponentFailures { failures: Vec<RegistryError> },

    // File system errors
    #[error("Failed to read file: {path}: {reason}")]
    #[diagnostic(code(nfcomp::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}: {reason}")]
    #[diagnostic(code(nfcomp::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(nfcomp::fs::io_error))]
    IoError { message: String },
}

impl RegistryError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            RegistryError::ComponentUnknown { .. }
            | RegistryError::BranchUnknown { .. }
            | RegistryError::RevisionUnknown { .. }
            | RegistryError::OrgPathConflict { .. }
            | RegistryError::PatchConflict { .. }
            | RegistryError::PatchInvalid { .. }
            | RegistryError::ComponentUnchanged { .. }
            | RegistryError::Refused { .. } => EXIT_USER,

            RegistryError::NotAPipeline { .. }
            | RegistryError::ProducerRepository { .. }
            | RegistryError::ConfigInvalid { .. }
            | RegistryError::ManifestInvalid { .. }
            | RegistryError::FileReadFailed { .. }
            | RegistryError::FileWriteFailed { .. }
            | RegistryError::IoError { .. } => EXIT_ENVIRONMENT,

            RegistryError::RegistryUnreachable { .. }
            | RegistryError::LayoutInvalid { .. }
            | RegistryError::GitOperationFailed { .. } => EXIT_REMOTE,

            RegistryError::ManifestInvariantViolation { .. } => EXIT_MANIFEST,

            RegistryError::ComponentFailures { failures } => failures
                .first()
                .map(RegistryError::exit_code)
                .unwrap_or(EXIT_USER),
        }
    }

    /// Whether this error only concerns the component being processed
    ///
    /// Per-component errors are collected and reported at the end of a
    /// command; all other errors abort the command immediately.
    pub fn is_per_component(&self) -> bool {
        matches!(
            self,
            RegistryError::PatchConflict { .. }
                | RegistryError::Refused { .. }
                | RegistryError::ComponentUnknown { .. }
                | RegistryError::RevisionUnknown { .. }
                | RegistryError::ComponentUnchanged { .. }
        )
    }
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for RegistryError {
    fn from(err: serde_yaml::Error) -> Self {
        RegistryError::ConfigInvalid {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::ManifestInvalid {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<git2::Error> for RegistryError {
    fn from(err: git2::Error) -> Self {
        RegistryError::GitOperationFailed {
            message: err.message().to_string(),
        }
    }
}

impl From<inquire::InquireError> for RegistryError {
    fn from(err: inquire::InquireError) -> Self {
        match err {
            inquire::InquireError::OperationCanceled
            | inquire::InquireError::OperationInterrupted => RegistryError::Refused {
                action: "answer the prompt".to_string(),
            },
            other => RegistryError::IoError {
                message: other.to_string(),
            },
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, RegistryError>;
