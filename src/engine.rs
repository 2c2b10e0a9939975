use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::PROFILE_TOKEN;
use crate::probe;
use crate::progress::ProgressSink;
use crate::sweep;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("a sweep is already in progress")]
    Busy,
    #[error("target list is empty")]
    EmptyTargets,
    #[error("target path contains an unresolved placeholder: {0}")]
    UnresolvedPlaceholder(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

/// The ordered set of directories one run operates on. Duplicates are
/// permitted; order only affects progress-line order.
///
/// Construction is where caller contract violations are rejected: an empty
/// list, or a path the config layer failed to resolve, never reaches a
/// worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSet {
    paths: Vec<PathBuf>,
}

impl TargetSet {
    pub fn new(paths: Vec<PathBuf>) -> Result<Self, EngineError> {
        if paths.is_empty() {
            return Err(EngineError::EmptyTargets);
        }
        for path in &paths {
            if path.to_string_lossy().contains(PROFILE_TOKEN) {
                return Err(EngineError::UnresolvedPlaceholder(
                    path.display().to_string(),
                ));
            }
        }
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Lifecycle of the engine's single run slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    Running = 1,
    Completed = 2,
    Cancelled = 3,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::Cancelled,
            _ => Self::Idle,
        }
    }
}

/// Terminal outcome of one sweep.
///
/// `reclaimed` is the before/after delta clamped at zero; a concurrent
/// writer can legitimately grow a target mid-sweep, and a negative figure
/// would mean nothing to a user. `deleted_bytes` is the sum of sizes of the
/// files this run actually removed; the two can diverge and both are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepResult {
    pub group: String,
    pub size_before: u64,
    pub size_after: u64,
    pub reclaimed: u64,
    pub deleted_bytes: u64,
    pub cancelled: bool,
}

impl SweepResult {
    fn from_passes(
        group: &str,
        size_before: u64,
        size_after: u64,
        deleted_bytes: u64,
        cancelled: bool,
    ) -> Self {
        Self {
            group: group.to_string(),
            size_before,
            size_after,
            reclaimed: size_before.saturating_sub(size_after),
            deleted_bytes,
            cancelled,
        }
    }
}

/// Drives the measure → delete → measure cycle and owns the one-run-at-a-time
/// gate.
///
/// The async methods return control to the caller immediately and do all
/// blocking filesystem work on the blocking pool; within one run the three
/// passes are strictly sequential. Only one run may be in flight per engine;
/// a second start while busy is rejected, never queued.
pub struct Engine {
    phase: AtomicU8,
    token: Mutex<CancellationToken>,
    sink: ProgressSink,
}

impl Engine {
    pub fn new(sink: ProgressSink) -> Self {
        Self {
            phase: AtomicU8::new(Phase::Idle as u8),
            token: Mutex::new(CancellationToken::new()),
            sink,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.phase() == Phase::Running
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Requests cancellation of the run currently in flight. Advisory:
    /// workers stop starting new per-item operations at their next check,
    /// in-flight deletions run to completion. Idempotent, and a no-op when
    /// nothing is running; the next run gets a fresh signal.
    pub fn request_cancel(&self) {
        if let Ok(token) = self.token.lock() {
            token.cancel();
        }
    }

    /// Full sweep of `targets`: size before, delete, size after.
    ///
    /// On cancellation during the first measurement the run returns early
    /// with nothing reclaimed. On cancellation during the sweep the final
    /// measurement still runs so the caller gets a coherent partial figure,
    /// and the result carries `cancelled = true`.
    pub async fn start_sweep(
        &self,
        group: &str,
        targets: &TargetSet,
    ) -> Result<SweepResult, EngineError> {
        let token = self.begin()?;
        let result = self.run_sweep(group, targets, &token).await;
        match &result {
            Ok(r) if r.cancelled => self.finish(Phase::Cancelled),
            _ => self.finish(Phase::Completed),
        }
        result
    }

    /// Measurement-only run: a strict subset of the sweep, one probe pass
    /// and no deletion.
    pub async fn start_measure_all(&self, targets: &TargetSet) -> Result<u64, EngineError> {
        let token = self.begin()?;
        let result = self.measure_pass(targets, &token).await;
        if token.is_cancelled() {
            self.finish(Phase::Cancelled);
        } else {
            self.finish(Phase::Completed);
        }
        result
    }

    async fn run_sweep(
        &self,
        group: &str,
        targets: &TargetSet,
        token: &CancellationToken,
    ) -> Result<SweepResult, EngineError> {
        let size_before = self.measure_pass(targets, token).await?;
        if token.is_cancelled() {
            return Ok(SweepResult::from_passes(
                group,
                size_before,
                size_before,
                0,
                true,
            ));
        }

        let deleted_bytes = self.sweep_pass(targets, token).await?;

        // The final measurement must complete even after a cancellation, so
        // it gets its own never-cancelled token.
        let probe_token = CancellationToken::new();
        let size_after = self.measure_pass(targets, &probe_token).await?;

        Ok(SweepResult::from_passes(
            group,
            size_before,
            size_after,
            deleted_bytes,
            token.is_cancelled(),
        ))
    }

    async fn measure_pass(
        &self,
        targets: &TargetSet,
        token: &CancellationToken,
    ) -> Result<u64, EngineError> {
        let targets = targets.clone();
        let token = token.clone();
        let sink = self.sink.clone();
        tokio::task::spawn_blocking(move || probe::measure_all(&targets, &token, &sink))
            .await
            .map_err(|err| EngineError::Internal(err.to_string()))
    }

    async fn sweep_pass(
        &self,
        targets: &TargetSet,
        token: &CancellationToken,
    ) -> Result<u64, EngineError> {
        let targets = targets.clone();
        let token = token.clone();
        let sink = self.sink.clone();
        tokio::task::spawn_blocking(move || sweep::sweep_all(&targets, &token, &sink))
            .await
            .map_err(|err| EngineError::Internal(err.to_string()))
    }

    /// Claims the run slot and installs a fresh cancellation token for this
    /// run. Any non-running phase may transition to `Running`.
    fn begin(&self) -> Result<CancellationToken, EngineError> {
        let current = self.phase.load(Ordering::Acquire);
        if current == Phase::Running as u8 {
            return Err(EngineError::Busy);
        }
        if self
            .phase
            .compare_exchange(
                current,
                Phase::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Err(EngineError::Busy);
        }

        let fresh = CancellationToken::new();
        if let Ok(mut guard) = self.token.lock() {
            *guard = fresh.clone();
        }
        Ok(fresh)
    }

    fn finish(&self, terminal: Phase) {
        self.phase.store(terminal as u8, Ordering::Release);
    }
}
