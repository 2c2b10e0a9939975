use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::engine::TargetSet;
use crate::progress::{ProgressEvent, ProgressSink};

/// Measures the aggregate size of every target in parallel.
///
/// Nonexistent targets contribute zero and produce no event. Each existing
/// target emits one [`ProgressEvent::Measured`] once its subtree has been
/// fully summed. Filesystem problems never surface as errors; only a
/// cancellation request cuts the pass short, returning the sum over the
/// targets that were measured in full. A tree whose walk was interrupted
/// neither counts nor reports, so no truncated figure escapes.
pub fn measure_all(targets: &TargetSet, token: &CancellationToken, sink: &ProgressSink) -> u64 {
    let total = AtomicU64::new(0);

    targets.paths().par_iter().for_each(|path| {
        if token.is_cancelled() {
            return;
        }
        if !path.is_dir() {
            return;
        }
        if let Some(bytes) = measure_tree(path, token) {
            total.fetch_add(bytes, Ordering::Relaxed);
            sink.emit(ProgressEvent::Measured {
                path: path.clone(),
                bytes,
            });
        }
    });

    total.load(Ordering::Relaxed)
}

/// Sums the sizes of all files under one directory.
///
/// Entries that fail to enumerate or stat are skipped; an unreadable subtree
/// contributes zero for its unreachable portion while already-collected
/// siblings are retained. Returns `None` when a cancellation request cuts
/// the walk short: a truncated figure is not a measurement and must not be
/// reported as one.
pub fn measure_tree(path: &Path, token: &CancellationToken) -> Option<u64> {
    let mut bytes = 0u64;
    for entry in WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if token.is_cancelled() {
            return None;
        }
        if entry.file_type().is_file() {
            bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
        }
    }
    Some(bytes)
}
