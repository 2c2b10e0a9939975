use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::engine::TargetSet;
use crate::progress::{ProgressEvent, ProgressSink};

/// Outcome of one low-level delete attempt. Failures carry a short reason
/// and are non-fatal by contract: the caller logs them and moves on.
enum ItemOutcome {
    Removed(u64),
    Skipped(String),
}

/// Deletes the contents of every target in parallel and returns the summed
/// size of the files actually removed.
///
/// This deletion-time sum is not the same figure as the orchestrator's
/// before/after delta; the orchestrator reconciles the two.
pub fn sweep_all(targets: &TargetSet, token: &CancellationToken, sink: &ProgressSink) -> u64 {
    let total = AtomicU64::new(0);

    targets.paths().par_iter().for_each(|path| {
        if token.is_cancelled() {
            return;
        }
        let bytes = sweep_tree(path, token, sink);
        total.fetch_add(bytes, Ordering::Relaxed);
    });

    total.load(Ordering::Relaxed)
}

/// Empties one target directory: files first, then directories bottom-up,
/// then the target itself if nothing is left in it.
///
/// The cancellation token is consulted per item, so an in-flight deletion
/// always completes or fails before the next check. A single locked file
/// never aborts the rest of the tree.
fn sweep_tree(path: &Path, token: &CancellationToken, sink: &ProgressSink) -> u64 {
    if !path.is_dir() {
        return 0;
    }

    let mut deleted = 0u64;

    for file in collect_files(path) {
        if token.is_cancelled() {
            return deleted;
        }
        match remove_file(&file) {
            ItemOutcome::Removed(bytes) => {
                deleted += bytes;
                sink.emit(ProgressEvent::DeletedFile { path: file, bytes });
            }
            ItemOutcome::Skipped(reason) => {
                sink.emit(ProgressEvent::Warning { path: file, reason });
            }
        }
    }

    // Deepest directories first, so children are always evaluated for
    // removal before their parents.
    let mut dirs = collect_dirs(path);
    dirs.sort_by_key(|(depth, _)| Reverse(*depth));

    for (_, dir) in dirs {
        if token.is_cancelled() {
            return deleted;
        }
        report_dir_removal(&dir, sink);
    }

    // Some targets are meant to be removed outright, not just emptied.
    if !token.is_cancelled() {
        report_dir_removal(path, sink);
    }

    deleted
}

fn collect_files(path: &Path) -> Vec<PathBuf> {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

fn collect_dirs(path: &Path) -> Vec<(usize, PathBuf)> {
    WalkDir::new(path)
        .follow_links(false)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| (e.depth(), e.into_path()))
        .collect()
}

/// Deletes one file, clearing a read-only attribute first. The size is read
/// before the deletion; afterwards there is nothing left to stat.
fn remove_file(path: &Path) -> ItemOutcome {
    let bytes = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    clear_readonly(path);
    match fs::remove_file(path) {
        Ok(()) => ItemOutcome::Removed(bytes),
        Err(err) => ItemOutcome::Skipped(err.to_string()),
    }
}

/// Removes `dir` if enumerating its immediate entries yields none at this
/// moment. Returns `None` when the directory is gone, unreadable, or still
/// has contents; none of those are events worth reporting.
fn remove_dir_if_empty(dir: &Path) -> Option<ItemOutcome> {
    if !dir.is_dir() {
        return None;
    }
    match fs::read_dir(dir) {
        Ok(mut entries) => {
            if entries.next().is_some() {
                return None;
            }
        }
        Err(_) => return None,
    }
    Some(match fs::remove_dir(dir) {
        Ok(()) => ItemOutcome::Removed(0),
        Err(err) => ItemOutcome::Skipped(err.to_string()),
    })
}

fn report_dir_removal(dir: &Path, sink: &ProgressSink) {
    match remove_dir_if_empty(dir) {
        Some(ItemOutcome::Removed(_)) => sink.emit(ProgressEvent::DeletedEmptyDir {
            path: dir.to_path_buf(),
        }),
        Some(ItemOutcome::Skipped(reason)) => sink.emit(ProgressEvent::Warning {
            path: dir.to_path_buf(),
            reason,
        }),
        None => {}
    }
}

/// Best-effort: failure to clear the attribute is not fatal, the deletion is
/// still attempted.
fn clear_readonly(path: &Path) {
    if let Ok(metadata) = fs::metadata(path) {
        let mut perms = metadata.permissions();
        if perms.readonly() {
            #[allow(clippy::permissions_set_readonly_false)]
            perms.set_readonly(false);
            let _ = fs::set_permissions(path, perms);
        }
    }
}
