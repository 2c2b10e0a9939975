use std::fmt;
use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::format_bytes;

/// One unit of human-readable status from a worker.
///
/// Events are emitted in the order work completes across targets, and a
/// single consumer receives them in exactly that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A top-level target's subtree has been fully measured.
    Measured { path: PathBuf, bytes: u64 },
    /// A file was deleted; `bytes` is its pre-deletion size.
    DeletedFile { path: PathBuf, bytes: u64 },
    /// A directory that enumerated empty was removed.
    DeletedEmptyDir { path: PathBuf },
    /// A recoverable per-item failure. The item was skipped; the sweep of
    /// its siblings continued.
    Warning { path: PathBuf, reason: String },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Measured { path, bytes } => {
                write!(f, "[i] size: {} - {}", format_bytes(*bytes), path.display())
            }
            Self::DeletedFile { path, bytes } => {
                write!(f, "[+] deleted: {} ({})", path.display(), format_bytes(*bytes))
            }
            Self::DeletedEmptyDir { path } => {
                write!(f, "[+] removed empty folder: {}", path.display())
            }
            Self::Warning { path, reason } => {
                write!(f, "[!] skipped {}: {reason}", path.display())
            }
        }
    }
}

/// Producer half of the progress channel. Cheap to clone; one clone per
/// worker.
#[derive(Clone)]
pub struct ProgressSink {
    tx: mpsc::Sender<ProgressEvent>,
}

/// Creates a bounded progress channel. The receiver is the single consumer;
/// it sees events in emission order and terminates once every sink clone has
/// been dropped.
pub fn channel(capacity: usize) -> (ProgressSink, mpsc::Receiver<ProgressEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (ProgressSink { tx }, rx)
}

impl ProgressSink {
    /// Sends one event. Callers run on worker threads, so a full buffer
    /// briefly blocks the producer rather than dropping the event. If the
    /// consumer has gone away the event is discarded; nobody is listening.
    pub fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.blocking_send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_render_as_single_log_lines() {
        let deleted = ProgressEvent::DeletedFile {
            path: PathBuf::from("/tmp/x/cache.bin"),
            bytes: 2048,
        };
        assert_eq!(deleted.to_string(), "[+] deleted: /tmp/x/cache.bin (2.00 KB)");

        let warn = ProgressEvent::Warning {
            path: PathBuf::from("/tmp/x/locked"),
            reason: "permission denied".into(),
        };
        assert_eq!(warn.to_string(), "[!] skipped /tmp/x/locked: permission denied");
    }

    #[test]
    fn channel_preserves_emission_order() {
        let (sink, mut rx) = channel(8);
        for i in 0..5u64 {
            sink.emit(ProgressEvent::Measured {
                path: PathBuf::from(format!("/t/{i}")),
                bytes: i,
            });
        }
        drop(sink);

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ProgressEvent::Measured { bytes, .. } = event {
                seen.push(bytes);
            }
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }
}
