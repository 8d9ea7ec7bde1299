//! History traversal and working-tree cleanup

use std::fs;
use std::path::Path;

use git2::{Commit, Repository, Sort, Status, StatusOptions};
use walkdir::WalkDir;

use crate::cutoff::Cutoff;
use crate::{Error, Result};

/// Find the newest commit reachable from HEAD whose commit time is strictly
/// before `cutoff`
///
/// History is walked in reverse-chronological order, so the first admitted
/// commit is the answer.
pub fn latest_commit_before<'r>(
    repo: &'r Repository,
    cutoff: &Cutoff,
) -> Result<Option<Commit<'r>>> {
    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TIME)?;
    revwalk.push_head()?;

    for oid in revwalk {
        let commit = repo.find_commit(oid?)?;
        if cutoff.admits(commit.time().seconds()) {
            return Ok(Some(commit));
        }
    }

    Ok(None)
}

/// Remove untracked files and directories from the working tree
///
/// Ignored files are left alone and directories emptied by a checkout are
/// pruned. Returns the number of untracked entries removed.
pub fn clean_untracked(repo: &Repository) -> Result<usize> {
    let workdir = repo
        .workdir()
        .ok_or_else(|| Error::Clone("Bare repositories cannot be cleaned".to_string()))?;

    let mut options = StatusOptions::new();
    options
        .include_untracked(true)
        .recurse_untracked_dirs(false)
        .include_ignored(false);

    let untracked: Vec<String> = repo
        .statuses(Some(&mut options))?
        .iter()
        .filter(|entry| entry.status().contains(Status::WT_NEW))
        .filter_map(|entry| entry.path().map(str::to_string))
        .collect();

    for relative in &untracked {
        let path = workdir.join(relative.trim_end_matches('/'));
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }

    prune_empty_dirs(workdir)?;

    Ok(untracked.len())
}

/// Remove empty directories below `root`, deepest first
fn prune_empty_dirs(root: &Path) -> Result<()> {
    let walker = WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");

    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_dir() && fs::read_dir(entry.path())?.next().is_none() {
            fs::remove_dir(entry.path())?;
        }
    }

    Ok(())
}
