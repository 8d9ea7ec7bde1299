//! Sequential collection of matching folders from finished clones

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::RunConfig;
use crate::copy::{copy_dir_all, remove_existing};
use crate::manifest::Manifest;
use crate::Result;

/// What one clone directory contributed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectReport {
    /// Name recorded in the manifest, if any match was copied
    pub manifest_entry: Option<String>,
    /// Output directories written, in discovery order
    pub copied: Vec<PathBuf>,
    /// Walk, removal, copy and manifest failures that were skipped
    pub failures: usize,
}

/// Totals across every clone directory seen by a collector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectStats {
    pub clones_scanned: usize,
    pub packages_recorded: usize,
    pub folders_copied: usize,
    pub failures: usize,
}

/// Copies folders whose name contains the filter into the output root
///
/// The collector owns the output root and the manifest. It is driven from a
/// single thread, one clone directory at a time.
#[derive(Debug)]
pub struct Collector {
    filter: String,
    output_root: PathBuf,
    search_roots: Vec<PathBuf>,
    manifest: Manifest,
    /// Output paths already cleared during this run
    initialized_outputs: HashSet<PathBuf>,
    /// Clone directories already processed during this run
    scanned_clones: HashSet<PathBuf>,
    stats: CollectStats,
}

impl Collector {
    pub fn new(
        filter: impl Into<String>,
        output_root: impl Into<PathBuf>,
        search_roots: Vec<PathBuf>,
        manifest: Manifest,
    ) -> Self {
        Self {
            filter: filter.into(),
            output_root: output_root.into(),
            search_roots,
            manifest,
            initialized_outputs: HashSet::new(),
            scanned_clones: HashSet::new(),
            stats: CollectStats::default(),
        }
    }

    /// Build a collector for a run, creating a fresh manifest
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let manifest = Manifest::create(&config.manifest_path)?;
        Ok(Self::new(
            config.filter.clone(),
            config.output_root.clone(),
            config.search_roots.clone(),
            manifest,
        ))
    }

    pub fn stats(&self) -> CollectStats {
        self.stats
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Candidate directories to search inside `clone_dir`, in search order
    pub fn candidate_roots(&self, clone_dir: &Path) -> Vec<PathBuf> {
        self.search_roots
            .iter()
            .map(|root| {
                // "" and "." both name the clone root
                root.components()
                    .filter(|c| !matches!(c, Component::CurDir))
                    .fold(clone_dir.to_path_buf(), |path, c| path.join(c))
            })
            .collect()
    }

    /// Collect every matching folder from one clone directory
    ///
    /// Failures are logged and counted; they never stop the scan.
    pub fn collect(&mut self, clone_dir: &Path) -> CollectReport {
        let mut report = CollectReport::default();

        if !self.scanned_clones.insert(clone_dir.to_path_buf()) {
            warn!(path = %clone_dir.display(), "Clone directory already collected, skipping");
            return report;
        }
        self.stats.clones_scanned += 1;

        // Nested search roots see the same folders again
        let mut seen_sources = HashSet::new();

        for root in self.candidate_roots(clone_dir) {
            if !root.is_dir() {
                debug!(path = %root.display(), "Search root not present");
                continue;
            }

            let walker = WalkDir::new(&root)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.file_name() != ".git");

            for entry in walker {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        warn!(root = %root.display(), "Error walking clone: {}", e);
                        report.failures += 1;
                        continue;
                    }
                };

                if !entry.file_type().is_dir() {
                    continue;
                }

                let name = entry.file_name().to_string_lossy().into_owned();
                if !name.contains(&self.filter) {
                    continue;
                }

                if seen_sources.insert(entry.path().to_path_buf()) {
                    self.collect_match(entry.path(), &name, &mut report);
                }
            }
        }

        self.stats.folders_copied += report.copied.len();
        self.stats.failures += report.failures;
        if report.manifest_entry.is_some() {
            self.stats.packages_recorded += 1;
        }

        report
    }

    fn collect_match(&mut self, source: &Path, name: &str, report: &mut CollectReport) {
        let dest = self.output_root.join(name);

        // Clear stale output from earlier runs the first time a path is used
        if !self.initialized_outputs.contains(&dest) {
            if let Err(e) = remove_existing(&dest) {
                warn!(path = %dest.display(), "Error removing destination directory: {}", e);
                report.failures += 1;
                return;
            }
            self.initialized_outputs.insert(dest.clone());
        }

        info!("Copying {} to {}", source.display(), dest.display());
        if let Err(e) = copy_dir_all(source, &dest) {
            warn!(source = %source.display(), "Error copying directory: {}", e);
            report.failures += 1;
            return;
        }
        report.copied.push(dest);

        if report.manifest_entry.is_none() {
            match self.manifest.append(name) {
                Ok(()) => {
                    info!(package = %name, "Package written to {}", self.manifest.path().display());
                    report.manifest_entry = Some(name.to_string());
                }
                Err(e) => {
                    warn!(package = %name, "Error writing manifest: {}", e);
                    report.failures += 1;
                }
            }
        }
    }
}
