//! Credentials for git operations
//!
//! Authentication is delegated to git's native credential system: the SSH
//! agent, keys in `~/.ssh/`, and configured credential helpers. libgit2 asks
//! again after every rejected credential, so each source is offered once.

use git2::{Cred, CredentialType, Error, ErrorClass, ErrorCode, RemoteCallbacks};

const SSH_KEY_NAMES: [&str; 3] = ["id_ed25519", "id_rsa", "id_ecdsa"];

#[derive(Default)]
struct Attempts {
    agent: bool,
    key_files: usize,
    helper: bool,
    default: bool,
}

fn auth_failed(msg: &str) -> Error {
    Error::new(ErrorCode::Auth, ErrorClass::Http, msg)
}

fn next_ssh_key(username: &str, attempts: &mut Attempts) -> Option<Cred> {
    let ssh_dir = dirs::home_dir()?.join(".ssh");
    while attempts.key_files < SSH_KEY_NAMES.len() {
        let key_name = SSH_KEY_NAMES[attempts.key_files];
        attempts.key_files += 1;

        let private_key = ssh_dir.join(key_name);
        if !private_key.exists() {
            continue;
        }
        let public_key = ssh_dir.join(format!("{key_name}.pub"));
        let public_key = public_key.exists().then_some(public_key);
        if let Ok(cred) = Cred::ssh_key(username, public_key.as_deref(), &private_key, None) {
            return Some(cred);
        }
    }
    None
}

/// Install a credentials callback on `callbacks`
pub fn setup_auth_callbacks(callbacks: &mut RemoteCallbacks) {
    let mut attempts = Attempts::default();

    callbacks.credentials(move |url, username_from_url, allowed| {
        if allowed.contains(CredentialType::DEFAULT) && !attempts.default {
            attempts.default = true;
            return Cred::default();
        }

        if allowed.contains(CredentialType::SSH_KEY) {
            let username = username_from_url.unwrap_or("git");
            if !attempts.agent {
                attempts.agent = true;
                if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                    return Ok(cred);
                }
            }
            if let Some(cred) = next_ssh_key(username, &mut attempts) {
                return Ok(cred);
            }
            return Err(auth_failed("no usable SSH key"));
        }

        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) && !attempts.helper {
            attempts.helper = true;
            let config = git2::Config::open_default()?;
            return Cred::credential_helper(&config, url, username_from_url);
        }

        if allowed.contains(CredentialType::USERNAME) {
            return Cred::username(username_from_url.unwrap_or("git"));
        }

        Err(auth_failed("authentication failed"))
    });
}
