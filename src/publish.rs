//! Destination provisioning and force push.
//!
//! Two halves:
//! - provisioning a fresh GitHub repository over the REST API (token
//!   auth, never embedded in the clone URL), and
//! - force-pushing the current branch of a working copy to `origin`
//!   with libgit2, classifying the failure so callers can tell an
//!   authentication problem from a connectivity problem.

use std::cell::RefCell;
use std::time::Duration;

use git2::{ErrorClass, ErrorCode, Repository};
use serde::Deserialize;
use thiserror::Error;

/// Override for the GitHub API root, for tests. Defaults to the public
/// endpoint.
pub const GITHUB_API_ENV: &str = "REWEAVE_GITHUB_API";

const DEFAULT_API_ROOT: &str = "https://api.github.com";
const USER_AGENT: &str = "reweave";

#[derive(Error, Debug)]
pub enum PublishError {
    /// The provider rejected our credentials.
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// We could not reach the remote at all.
    #[error("could not reach remote: {message}")]
    Connectivity { message: String },

    /// The provider answered with a non-auth error status.
    #[error("provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("{0}")]
    Generic(String),

    #[error("push failed: {0}")]
    Git(#[from] git2::Error),
}

/// A provisioned destination repository.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionedRepo {
    pub name: String,
    /// SSH locator, used for the subsequent push.
    pub ssh_url: String,
    pub clone_url: String,
    pub html_url: String,
}

/// Create a fresh repository under the token owner's account.
///
/// The repository is created without an initial commit so the first
/// push lands on an empty ref namespace. A 401 maps to [`PublishError::Auth`]
/// with a hint about token scope, since an expired or under-scoped token
/// is by far the most common failure here.
pub fn provision_repository(
    token: &str,
    name: &str,
    private: bool,
) -> Result<ProvisionedRepo, PublishError> {
    let root =
        std::env::var(GITHUB_API_ENV).unwrap_or_else(|_| DEFAULT_API_ROOT.to_string());
    let url = format!("{root}/user/repos");

    let agent = ureq::AgentBuilder::new()
        .timeout(Duration::from_secs(30))
        .build();
    tracing::debug!(name, private, "provisioning destination repository");
    let response = agent
        .post(&url)
        .set("User-Agent", USER_AGENT)
        .set("Authorization", &format!("token {token}"))
        .set("Accept", "application/vnd.github+json")
        .send_json(ureq::json!({
            "name": name,
            "private": private,
            "auto_init": false,
        }));

    match response {
        Ok(resp) => {
            let repo: ProvisionedRepo = resp
                .into_json()
                .map_err(|e| PublishError::Generic(format!("bad provider response: {e}")))?;
            Ok(repo)
        }
        Err(ureq::Error::Status(status, resp)) => {
            let body = resp.into_string().unwrap_or_default();
            if status == 401 || status == 403 {
                Err(PublishError::Auth {
                    message: format!(
                        "provider returned {status}; check that the token is valid and has the repo scope"
                    ),
                })
            } else {
                Err(PublishError::Provider {
                    status,
                    message: truncate(&body, 200),
                })
            }
        }
        Err(ureq::Error::Transport(transport)) => Err(PublishError::Connectivity {
            message: transport.to_string(),
        }),
    }
}

/// Force-push the currently checked out branch to `origin`.
///
/// Returns the branch name that was pushed. Rejections reported through
/// the per-ref callback surface as errors even when the transport call
/// itself succeeds.
pub fn push_current_branch(repo: &Repository) -> Result<String, PublishError> {
    let head = repo.head()?;
    let branch = head
        .shorthand()
        .ok_or_else(|| PublishError::Generic("HEAD is not on a named branch".to_string()))?
        .to_string();
    let refspec = format!("+refs/heads/{branch}:refs/heads/{branch}");

    let mut remote = repo.find_remote("origin")?;
    let push_error: RefCell<Option<String>> = RefCell::new(None);

    let push_result = {
        let cfg = repo.config().ok();
        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.credentials(move |url, username_from_url, allowed| {
            if allowed.is_ssh_key() {
                if let Some(user) = username_from_url {
                    return git2::Cred::ssh_key_from_agent(user);
                }
            }
            if allowed.is_user_pass_plaintext() {
                if let Some(ref cfg) = cfg {
                    if let Ok(cred) =
                        git2::Cred::credential_helper(cfg, url, username_from_url)
                    {
                        return Ok(cred);
                    }
                }
            }
            git2::Cred::default()
        });
        callbacks.push_update_reference(|_ref_name, status| {
            if let Some(msg) = status {
                *push_error.borrow_mut() = Some(msg.to_string());
            }
            Ok(())
        });

        let mut push_options = git2::PushOptions::new();
        push_options.remote_callbacks(callbacks);
        remote.push(&[refspec.as_str()], Some(&mut push_options))
    };

    push_result.map_err(classify)?;
    if let Some(message) = push_error.into_inner() {
        return Err(PublishError::Generic(format!(
            "remote rejected {branch}: {message}"
        )));
    }
    tracing::info!(branch, "force-pushed to origin");
    Ok(branch)
}

/// Map a libgit2 transport failure onto the publish taxonomy.
fn classify(err: git2::Error) -> PublishError {
    let message = err.message().to_string();
    let lower = message.to_lowercase();
    if err.code() == ErrorCode::Auth
        || lower.contains("authentication")
        || lower.contains("401")
        || lower.contains("credentials")
    {
        return PublishError::Auth { message };
    }
    if matches!(err.class(), ErrorClass::Net | ErrorClass::Http | ErrorClass::Ssh)
        || lower.contains("could not resolve")
        || lower.contains("connection")
        || lower.contains("timed out")
    {
        return PublishError::Connectivity { message };
    }
    PublishError::Git(err)
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &text[..end])
    }
}
