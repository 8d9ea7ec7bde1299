//! Concurrent clone-and-collect pipeline
//!
//! One blocking task per repository row publishes finished clones onto an
//! unbounded queue. A single collector task drains the queue in arrival
//! order. The queue is closed only after every worker has finished, so the
//! collector sees every successful clone before the run ends.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::collect::{CollectStats, Collector};
use crate::config::RunConfig;
use crate::git::{GitBackend, Rewind, Vcs};
use crate::source::RepoDescriptor;
use crate::worker::{CloneResult, CloneWorker, WorkerReport};
use crate::{Error, Result};

/// End-of-run counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Rows read from the source table, one worker each
    pub repositories: usize,
    pub cloned: usize,
    pub failed: usize,
    /// Clones moved back to a commit before the cutoff
    pub rewound: usize,
    /// Clones left at HEAD because nothing predates the cutoff
    pub no_commit_before_cutoff: usize,
    /// Destination names of repositories that failed
    pub failures: Vec<String>,
    pub collect: CollectStats,
}

impl RunSummary {
    fn record(&mut self, report: WorkerReport) {
        match report.outcome {
            Ok(rewind) => {
                self.cloned += 1;
                match rewind {
                    Some(Rewind::CheckedOut { .. }) => self.rewound += 1,
                    Some(Rewind::NoCommitBefore) => self.no_commit_before_cutoff += 1,
                    None => {}
                }
            }
            Err(_) => self.record_failure(report.name),
        }
    }

    fn record_failure(&mut self, name: String) {
        self.failed += 1;
        self.failures.push(name);
    }
}

/// Runs the whole pipeline for one source table
#[derive(Clone)]
pub struct Harvester {
    config: Arc<RunConfig>,
    vcs: Arc<dyn Vcs>,
}

impl std::fmt::Debug for Harvester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harvester")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Harvester {
    /// Create a harvester backed by libgit2
    pub fn new(config: RunConfig) -> Self {
        Self::with_vcs(config, Arc::new(GitBackend::new()))
    }

    /// Create a harvester with a custom version-control client
    pub fn with_vcs(config: RunConfig, vcs: Arc<dyn Vcs>) -> Self {
        Self {
            config: Arc::new(config),
            vcs,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Clone every descriptor concurrently and collect as clones finish
    ///
    /// Only a manifest that cannot be created is an error; per-repository and
    /// per-folder failures are logged and counted in the summary.
    pub async fn run(&self, descriptors: Vec<RepoDescriptor>) -> Result<RunSummary> {
        let mut collector = Collector::from_config(&self.config)?;
        let (tx, mut rx) = mpsc::unbounded_channel::<CloneResult>();

        let collector_task = tokio::task::spawn_blocking(move || {
            while let Some(result) = rx.blocking_recv() {
                info!(repo = %result.name, "Collecting from {}", result.local_directory.display());
                collector.collect(&result.local_directory);
            }
            collector.stats()
        });

        let mut summary = RunSummary {
            repositories: descriptors.len(),
            ..Default::default()
        };

        let worker = CloneWorker::new(Arc::clone(&self.vcs), Arc::clone(&self.config));
        let mut workers = JoinSet::new();

        for descriptor in descriptors {
            let worker = worker.clone();
            let queue = tx.clone();
            workers.spawn_blocking(move || {
                panic::catch_unwind(AssertUnwindSafe(|| worker.execute(&descriptor, &queue)))
                    .unwrap_or_else(|_| {
                        error!(repo = %descriptor.destination, "Clone worker panicked");
                        WorkerReport {
                            name: descriptor.destination.clone(),
                            outcome: Err(Error::Other("worker panicked".to_string())),
                        }
                    })
            });
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(report) => summary.record(report),
                Err(e) => {
                    error!("Clone worker did not finish: {}", e);
                    summary.failed += 1;
                }
            }
        }

        // Every worker is done; closing the queue lets the collector finish
        drop(tx);

        summary.collect = collector_task
            .await
            .map_err(|e| Error::Other(format!("Collector task failed: {}", e)))?;

        info!(
            repositories = summary.repositories,
            cloned = summary.cloned,
            failed = summary.failed,
            packages = summary.collect.packages_recorded,
            "All repositories cloned and folders copied"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_outcomes() {
        let mut summary = RunSummary::default();
        summary.record(WorkerReport {
            name: "a".to_string(),
            outcome: Ok(None),
        });
        summary.record(WorkerReport {
            name: "b".to_string(),
            outcome: Ok(Some(Rewind::CheckedOut {
                commit: "abc".to_string(),
                removed: 1,
            })),
        });
        summary.record(WorkerReport {
            name: "c".to_string(),
            outcome: Ok(Some(Rewind::NoCommitBefore)),
        });
        summary.record(WorkerReport {
            name: "d".to_string(),
            outcome: Err(Error::Clone("unreachable".to_string())),
        });

        assert_eq!(summary.cloned, 3);
        assert_eq!(summary.rewound, 1);
        assert_eq!(summary.no_commit_before_cutoff, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures, vec!["d".to_string()]);
    }

    #[test]
    fn test_summary_serializes() {
        let json = serde_json::to_value(RunSummary::default()).unwrap();
        assert_eq!(json["repositories"], 0);
        assert_eq!(json["collect"]["packages_recorded"], 0);
    }
}
