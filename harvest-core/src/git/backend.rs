//! libgit2-backed clone and rewind

use std::path::Path;

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Cred, CredentialType, FetchOptions, RemoteCallbacks, Repository};
use tracing::debug;

use super::history::{clean_untracked, latest_commit_before};
use super::{Rewind, Vcs};
use crate::cutoff::Cutoff;
use crate::secrets::Credentials;
use crate::source::RepoDescriptor;
use crate::{Error, Result};

/// Credential offered in answer to one libgit2 request
#[derive(Debug, Clone, PartialEq, Eq)]
enum CredentialChoice {
    UserPass,
    SshAgent(String),
    Username(String),
    Default,
    Reject,
}

/// Offers credentials at most once per clone
///
/// libgit2 keeps asking while the remote rejects us. A bare username request
/// (ssh URL without a user) carries no secret and is always answered.
#[derive(Debug, Default)]
struct CredentialPolicy {
    offered: u32,
}

impl CredentialPolicy {
    fn choose(
        &mut self,
        allowed: CredentialType,
        username_from_url: Option<&str>,
    ) -> CredentialChoice {
        let ssh_user = username_from_url.unwrap_or("git").to_string();

        if allowed == CredentialType::USERNAME {
            return CredentialChoice::Username(ssh_user);
        }

        self.offered += 1;
        if self.offered > 1 {
            return CredentialChoice::Reject;
        }

        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            CredentialChoice::UserPass
        } else if allowed.contains(CredentialType::SSH_KEY) {
            CredentialChoice::SshAgent(ssh_user)
        } else if allowed.contains(CredentialType::USERNAME) {
            CredentialChoice::Username(ssh_user)
        } else {
            CredentialChoice::Default
        }
    }
}

/// [`Vcs`] implementation on top of `git2`
#[derive(Debug, Clone, Default)]
pub struct GitBackend;

impl GitBackend {
    pub fn new() -> Self {
        Self
    }

    fn remote_callbacks<'a>(name: &str, credentials: &Credentials) -> RemoteCallbacks<'a> {
        let mut callbacks = RemoteCallbacks::new();

        let username = credentials.username.clone();
        let token = credentials.access_token.clone();
        let mut policy = CredentialPolicy::default();
        callbacks.credentials(move |_url, username_from_url, allowed| {
            match policy.choose(allowed, username_from_url) {
                CredentialChoice::UserPass => Cred::userpass_plaintext(&username, &token),
                CredentialChoice::SshAgent(user) => Cred::ssh_key_from_agent(&user),
                CredentialChoice::Username(user) => Cred::username(&user),
                CredentialChoice::Default => Cred::default(),
                CredentialChoice::Reject => {
                    Err(git2::Error::from_str("credentials rejected by remote"))
                }
            }
        });

        let name = name.to_string();
        let mut last_percent = 0;
        callbacks.transfer_progress(move |stats| {
            let total = stats.total_objects();
            if total > 0 {
                let percent = stats.received_objects() * 100 / total;
                if percent / 25 > last_percent / 25 {
                    last_percent = percent;
                    debug!(
                        repo = %name,
                        received = stats.received_objects(),
                        total,
                        "Clone progress {}%",
                        percent
                    );
                }
            }
            true
        });

        callbacks
    }
}

impl Vcs for GitBackend {
    fn clone_repo(
        &self,
        descriptor: &RepoDescriptor,
        target: &Path,
        credentials: &Credentials,
    ) -> Result<()> {
        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(Self::remote_callbacks(&descriptor.destination, credentials));

        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_options);
        if let Some(ref branch) = descriptor.branch {
            builder.branch(branch);
        }

        builder.clone(&descriptor.url, target).map_err(|e| {
            Error::Clone(format!(
                "Failed to clone {}: {}",
                descriptor.display_url(),
                e.message()
            ))
        })?;

        Ok(())
    }

    fn rewind(&self, target: &Path, cutoff: &Cutoff) -> Result<Rewind> {
        let repo = Repository::open(target)?;

        let Some(commit) = latest_commit_before(&repo, cutoff)? else {
            return Ok(Rewind::NoCommitBefore);
        };

        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        repo.checkout_tree(commit.as_object(), Some(&mut checkout))
            .map_err(|e| Error::Clone(format!("Failed to check out {}: {}", commit.id(), e)))?;
        repo.set_head_detached(commit.id())?;

        let removed = clean_untracked(&repo)?;

        Ok(Rewind::CheckedOut {
            commit: commit.id().to_string(),
            removed,
        })
    }
}
