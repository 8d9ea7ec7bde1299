//! Clone workers: one per repository row

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};

use crate::config::RunConfig;
use crate::copy::remove_existing;
use crate::git::{Rewind, Vcs};
use crate::source::RepoDescriptor;
use crate::{Error, Result};

/// A finished clone handed to the collector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneResult {
    /// Destination name from the source table
    pub name: String,
    pub local_directory: PathBuf,
}

/// Outcome of one worker, returned to the pipeline for the run summary
#[derive(Debug)]
pub struct WorkerReport {
    pub name: String,
    pub outcome: Result<Option<Rewind>>,
}

/// Clones one repository and optionally rewinds it to the cutoff
#[derive(Clone)]
pub struct CloneWorker {
    vcs: Arc<dyn Vcs>,
    config: Arc<RunConfig>,
}

impl std::fmt::Debug for CloneWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloneWorker")
            .field("clone_root", &self.config.clone_root)
            .finish_non_exhaustive()
    }
}

impl CloneWorker {
    pub fn new(vcs: Arc<dyn Vcs>, config: Arc<RunConfig>) -> Self {
        Self { vcs, config }
    }

    /// Run the worker and publish the clone directory on success
    ///
    /// Errors are logged here and reported back, never propagated.
    pub fn execute(
        &self,
        descriptor: &RepoDescriptor,
        queue: &UnboundedSender<CloneResult>,
    ) -> WorkerReport {
        let outcome = self.prepare(descriptor).and_then(|result| {
            let rewind = self.checkout_cutoff(descriptor, &result)?;
            Ok((result, rewind))
        });

        let outcome = match outcome {
            Ok((result, rewind)) => {
                if queue.send(result).is_err() {
                    error!(repo = %descriptor.destination, "Collector stopped before clone was published");
                }
                Ok(rewind)
            }
            Err(e) => {
                error!(repo = %descriptor.destination, url = %descriptor.display_url(), "{}", e);
                Err(e)
            }
        };

        WorkerReport {
            name: descriptor.destination.clone(),
            outcome,
        }
    }

    /// Remove any previous clone and clone afresh
    fn prepare(&self, descriptor: &RepoDescriptor) -> Result<CloneResult> {
        let target = descriptor.target_dir(&self.config.clone_root);

        remove_existing(&target).map_err(|e| {
            Error::Clone(format!(
                "Failed to delete existing directory {}: {}",
                target.display(),
                e
            ))
        })?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(
            branch = descriptor.branch.as_deref().unwrap_or("(default)"),
            "Cloning {} into {}...",
            descriptor.display_url(),
            target.display()
        );
        self.vcs
            .clone_repo(descriptor, &target, &self.config.credentials)?;

        Ok(CloneResult {
            name: descriptor.destination.clone(),
            local_directory: target,
        })
    }

    fn checkout_cutoff(
        &self,
        descriptor: &RepoDescriptor,
        result: &CloneResult,
    ) -> Result<Option<Rewind>> {
        let Some(cutoff) = self.config.cutoff else {
            return Ok(None);
        };

        let rewind = self.vcs.rewind(&result.local_directory, &cutoff)?;
        match &rewind {
            Rewind::CheckedOut { commit, removed } => {
                info!(
                    repo = %descriptor.destination,
                    removed,
                    "Checked out latest commit before {}: {}",
                    cutoff,
                    commit
                );
            }
            Rewind::NoCommitBefore => {
                warn!(
                    repo = %descriptor.destination,
                    "No commits before {}, keeping default head",
                    cutoff
                );
            }
        }

        Ok(Some(rewind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cutoff::Cutoff;
    use crate::secrets::Credentials;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    /// Writes a marker file instead of cloning
    #[derive(Default)]
    struct StubVcs {
        fail_clone: bool,
        rewind: Option<Rewind>,
        rewinds: Mutex<Vec<PathBuf>>,
    }

    impl Vcs for StubVcs {
        fn clone_repo(&self, d: &RepoDescriptor, target: &Path, _: &Credentials) -> Result<()> {
            if self.fail_clone {
                return Err(Error::Clone(format!("cannot reach {}", d.url)));
            }
            fs::create_dir_all(target)?;
            fs::write(target.join("CLONED"), &d.url)?;
            Ok(())
        }

        fn rewind(&self, target: &Path, _: &Cutoff) -> Result<Rewind> {
            self.rewinds.lock().unwrap().push(target.to_path_buf());
            Ok(self.rewind.clone().unwrap_or(Rewind::NoCommitBefore))
        }
    }

    fn run_config(root: &Path, cutoff: Option<&str>) -> Arc<RunConfig> {
        Arc::new(RunConfig {
            credentials: Credentials::new("bot", "token"),
            cutoff: cutoff.map(|c| Cutoff::parse(c).unwrap()),
            filter: "pkg".to_string(),
            output_root: root.join("out"),
            manifest_path: root.join("TestedPackages.txt"),
            sources_path: root.join("repos.csv"),
            clone_root: root.join("repo"),
            search_roots: crate::config::default_search_roots(),
        })
    }

    #[test]
    fn test_success_publishes_clone_directory() {
        let dir = TempDir::new().unwrap();
        let vcs = Arc::new(StubVcs::default());
        let worker = CloneWorker::new(vcs.clone(), run_config(dir.path(), None));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let report = worker.execute(&RepoDescriptor::new("u", "alice", None), &tx);

        assert!(matches!(report.outcome, Ok(None)));
        let published = rx.try_recv().unwrap();
        assert_eq!(published.local_directory, dir.path().join("repo/alice"));
        assert!(rx.try_recv().is_err());
        // No cutoff configured, so history is left alone
        assert!(vcs.rewinds.lock().unwrap().is_empty());
    }

    #[test]
    fn test_existing_directory_replaced() {
        let dir = TempDir::new().unwrap();
        let stale = dir.path().join("repo/alice/old.txt");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "old").unwrap();

        let worker = CloneWorker::new(Arc::new(StubVcs::default()), run_config(dir.path(), None));
        let (tx, _rx) = mpsc::unbounded_channel();
        worker.execute(&RepoDescriptor::new("u", "alice", None), &tx);

        assert!(!stale.exists());
        assert!(dir.path().join("repo/alice/CLONED").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_removal_failure_aborts_only_that_repository() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("repo/alice");
        fs::create_dir_all(&locked).unwrap();
        fs::write(locked.join("old.txt"), "old").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();
        if fs::write(locked.join(".write-check"), "").is_ok() {
            // Permissions are not enforced for this user
            return;
        }

        let vcs = Arc::new(StubVcs::default());
        let worker = CloneWorker::new(vcs, run_config(dir.path(), None));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let failed = worker.execute(&RepoDescriptor::new("u", "alice", None), &tx);
        let sibling = worker.execute(&RepoDescriptor::new("u", "bob", None), &tx);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        match failed.outcome {
            Err(Error::Clone(msg)) => assert!(msg.contains("Failed to delete existing directory")),
            other => panic!("expected removal failure, got {:?}", other),
        }
        assert!(matches!(sibling.outcome, Ok(None)));
        assert_eq!(rx.try_recv().unwrap().name, "bob");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_clone_failure_publishes_nothing() {
        let dir = TempDir::new().unwrap();
        let vcs = Arc::new(StubVcs {
            fail_clone: true,
            ..Default::default()
        });
        let worker = CloneWorker::new(vcs, run_config(dir.path(), Some("2024-01-01 00:00:00")));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let report = worker.execute(&RepoDescriptor::new("u", "bob", None), &tx);

        assert!(matches!(report.outcome, Err(Error::Clone(_))));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_cutoff_triggers_rewind() {
        let dir = TempDir::new().unwrap();
        let vcs = Arc::new(StubVcs {
            rewind: Some(Rewind::CheckedOut {
                commit: "abc123".to_string(),
                removed: 0,
            }),
            ..Default::default()
        });
        let worker = CloneWorker::new(vcs.clone(), run_config(dir.path(), Some("2024-01-01 00:00:00")));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let report = worker.execute(&RepoDescriptor::new("u", "carol", None), &tx);

        assert!(matches!(report.outcome, Ok(Some(Rewind::CheckedOut { .. }))));
        assert_eq!(
            vcs.rewinds.lock().unwrap().as_slice(),
            [dir.path().join("repo/carol")]
        );
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_no_commit_before_cutoff_still_publishes() {
        let dir = TempDir::new().unwrap();
        let worker = CloneWorker::new(
            Arc::new(StubVcs::default()),
            run_config(dir.path(), Some("2000-01-01 00:00:00")),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        let report = worker.execute(&RepoDescriptor::new("u", "dave", None), &tx);

        assert!(matches!(report.outcome, Ok(Some(Rewind::NoCommitBefore))));
        assert!(rx.try_recv().is_ok());
    }
}
