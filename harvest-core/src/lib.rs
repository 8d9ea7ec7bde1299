//! Harvest Core - clone many repositories and collect package folders
//!
//! Rows of a CSV table are cloned concurrently, optionally rewound to the
//! newest commit before a cutoff, and folders whose name contains a filter
//! substring are copied into one output directory. A manifest records the
//! first package collected from each clone.

pub mod collect;
pub mod config;
pub mod copy;
pub mod cutoff;
pub mod error;
pub mod git;
pub mod manifest;
pub mod pipeline;
pub mod secrets;
pub mod source;
pub mod worker;

pub use collect::{CollectReport, CollectStats, Collector};
pub use config::{Config, ConfigOverrides, RunConfig};
pub use copy::copy_dir_all;
pub use cutoff::Cutoff;
pub use error::{Error, Result};
pub use git::{GitBackend, Rewind, Vcs};
pub use manifest::Manifest;
pub use pipeline::{Harvester, RunSummary};
pub use secrets::{Credentials, Secrets};
pub use source::{parse_sources, read_sources, RepoDescriptor};
pub use worker::{CloneResult, CloneWorker, WorkerReport};
