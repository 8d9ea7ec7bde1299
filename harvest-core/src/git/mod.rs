//! Version-control operations used by clone workers
//!
//! The pipeline only talks to the [`Vcs`] trait; [`GitBackend`] is the
//! libgit2 implementation used in production.

mod backend;
mod history;

use std::path::Path;

pub use backend::GitBackend;
pub use history::{clean_untracked, latest_commit_before};

use crate::cutoff::Cutoff;
use crate::secrets::Credentials;
use crate::source::RepoDescriptor;
use crate::Result;

/// What happened when a clone was rewound to a cutoff
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewind {
    /// The working tree now matches `commit`; `removed` untracked entries were cleaned
    CheckedOut { commit: String, removed: usize },
    /// Every commit reachable from HEAD is at or after the cutoff; HEAD is untouched
    NoCommitBefore,
}

/// Blocking version-control client
pub trait Vcs: Send + Sync {
    /// Clone `descriptor` into `target`, which must not exist
    fn clone_repo(
        &self,
        descriptor: &RepoDescriptor,
        target: &Path,
        credentials: &Credentials,
    ) -> Result<()>;

    /// Check out the newest commit strictly before `cutoff` and clean the tree
    fn rewind(&self, target: &Path, cutoff: &Cutoff) -> Result<Rewind>;
}
