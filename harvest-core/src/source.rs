//! Repository source table parsing
//!
//! The table is a header-less CSV file where each row is
//! `url,destination[,branch]`.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// One repository to clone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoDescriptor {
    /// Remote URL (https, ssh or a local path)
    pub url: String,
    /// Folder name under the clone root
    pub destination: String,
    /// Branch to clone instead of the remote default
    pub branch: Option<String>,
}

impl RepoDescriptor {
    /// Create a descriptor, treating a blank branch as the default branch
    pub fn new(
        url: impl Into<String>,
        destination: impl Into<String>,
        branch: Option<String>,
    ) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            branch: branch.filter(|b| !b.trim().is_empty()),
        }
    }

    /// Local clone directory for this descriptor under `clone_root`
    pub fn target_dir(&self, clone_root: &Path) -> PathBuf {
        clone_root.join(&self.destination)
    }

    /// URL safe for logging, with any embedded password removed
    pub fn display_url(&self) -> String {
        match url::Url::parse(&self.url) {
            Ok(mut parsed) if parsed.password().is_some() => {
                let _ = parsed.set_password(Some("***"));
                parsed.to_string()
            }
            _ => self.url.clone(),
        }
    }
}

/// Read the source table at `path`
///
/// Any missing file, unreadable file or malformed row is an error; the caller
/// treats it as fatal.
pub fn read_sources(path: &Path) -> Result<Vec<RepoDescriptor>> {
    let file = File::open(path).map_err(|e| {
        Error::Source(format!(
            "Failed to open repository list {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_sources(file)
}

/// Parse a source table from any reader
pub fn parse_sources<R: Read>(reader: R) -> Result<Vec<RepoDescriptor>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut descriptors = Vec::new();
    let mut seen = HashSet::new();

    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() < 2 || record.len() > 3 {
            return Err(Error::Source(format!(
                "line {}: expected 2 or 3 columns (url, destination[, branch]), found {}",
                line,
                record.len()
            )));
        }

        let url = &record[0];
        let destination = &record[1];
        let branch = record.get(2).map(str::to_string);

        if url.is_empty() {
            return Err(Error::Source(format!("line {}: empty repository URL", line)));
        }
        validate_destination(destination)
            .map_err(|reason| Error::Source(format!("line {}: {}", line, reason)))?;

        if !seen.insert(destination.to_string()) {
            return Err(Error::Source(format!(
                "line {}: duplicate destination '{}'",
                line, destination
            )));
        }

        descriptors.push(RepoDescriptor::new(url, destination, branch));
    }

    Ok(descriptors)
}

/// A destination must be exactly one normal path component
fn validate_destination(destination: &str) -> std::result::Result<(), String> {
    if destination.is_empty() {
        return Err("empty destination name".to_string());
    }

    let mut components = Path::new(destination).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(format!(
            "destination '{}' must be a single folder name",
            destination
        )),
    }
}
