//! Manifest of collected package names

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::Result;

/// Append-only list of package names, one per line
///
/// Created fresh for every run so a re-run never duplicates lines.
#[derive(Debug)]
pub struct Manifest {
    path: PathBuf,
    file: File,
    entries: Vec<String>,
}

impl Manifest {
    /// Create (or truncate) the manifest at `path`
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;

        Ok(Self {
            path,
            file,
            entries: Vec::new(),
        })
    }

    /// Append one name and flush it to disk
    pub fn append(&mut self, name: &str) -> Result<()> {
        writeln!(self.file, "{}", name)?;
        self.file.flush()?;
        self.entries.push(name.to_string());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names written so far, in write order
    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_writes_lines_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports/TestedPackages.txt");

        let mut manifest = Manifest::create(&path).unwrap();
        manifest.append("alpha").unwrap();
        manifest.append("beta").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "alpha\nbeta\n");
        assert_eq!(manifest.entries(), ["alpha", "beta"]);
    }

    #[test]
    fn test_create_truncates_previous_run() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("TestedPackages.txt");
        fs::write(&path, "old\n").unwrap();

        let manifest = Manifest::create(&path).unwrap();
        assert!(manifest.entries().is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
