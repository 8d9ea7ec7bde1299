//! Shared fixtures for pipeline tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use git2::{IndexAddOption, Repository, Signature, Time};
use harvest_core::{config::default_search_roots, Credentials, Cutoff, RunConfig};
use walkdir::WalkDir;

pub const T1: i64 = 1_700_000_000;
pub const T2: i64 = 1_700_100_000;
pub const T3: i64 = 1_700_200_000;

/// Run configuration rooted in a scratch directory
pub fn run_config(root: &Path, filter: &str, cutoff: Option<i64>) -> RunConfig {
    RunConfig {
        credentials: Credentials::new("bot", "token"),
        cutoff: cutoff.map(|secs| Cutoff::from(chrono::DateTime::from_timestamp(secs, 0).unwrap())),
        filter: filter.to_string(),
        output_root: root.join("out"),
        manifest_path: root.join("TestedPackages.txt"),
        sources_path: root.join("repos.csv"),
        clone_root: root.join("repo"),
        search_roots: default_search_roots(),
    }
}

/// Write `files` (None deletes) and commit them at `seconds`
pub fn commit_at(repo: &Repository, files: &[(&str, Option<&str>)], seconds: i64) {
    let workdir = repo.workdir().unwrap().to_path_buf();
    for (path, content) in files {
        let full = workdir.join(path);
        match content {
            Some(text) => {
                fs::create_dir_all(full.parent().unwrap()).unwrap();
                fs::write(&full, text).unwrap();
            }
            None => fs::remove_file(&full).unwrap(),
        }
    }

    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap();
    index.update_all(["*"].iter(), None).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let sig = Signature::new("Fixture", "fixture@example.com", &Time::new(seconds, 0)).unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, "fixture", &tree, &parents)
        .unwrap();
}

/// Upstream whose package folder changes at T1 < T2 < T3
///
/// At T3 a second package folder appears, so a cutoff between T2 and T3 must
/// not see it.
pub fn student_upstream(path: &Path, owner: &str) -> Repository {
    let repo = Repository::init(path).unwrap();
    let pkg = format!("{}-pkg", owner);
    let late = format!("src/main/java/com/{}-late-pkg/Late.java", owner);
    let main = format!("{}/Main.java", pkg);

    commit_at(&repo, &[(main.as_str(), Some("v1"))], T1);
    commit_at(&repo, &[(main.as_str(), Some("v2")), ("README.md", Some("hi"))], T2);
    commit_at(&repo, &[(main.as_str(), Some("v3")), (late.as_str(), Some("late"))], T3);
    repo
}

/// Every file below `root` with its content, `.git` excluded
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, String> {
    if !root.exists() {
        return BTreeMap::new();
    }
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            (rel, fs::read_to_string(e.path()).unwrap())
        })
        .collect()
}

pub fn manifest_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
