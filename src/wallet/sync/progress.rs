//! Progress adapters for script-level sync.
//!
//! The wallet engine calls an inspector once per script it checks. The two adapters here count
//! those calls and forward the aggregate to the [`ViewStateSink`], one adapter per strategy:
//!
//! - [`SyncProgressInspector`] for incremental sync, where the engine knows the total up front and
//!   progress is reported as `(inspected, total)` plus a derived fraction.
//! - [`FullScanProgressInspector`] for full scans, where the address space is discovered while
//!   scanning and only the inspected count is reported.
//!
//! Adapters are single use. Constructing one zeroes the view's counters and opens a new progress
//! epoch; the orchestrator retires it as soon as the engine call returns, timeouts included. A
//! retired adapter ignores further inspections even if the engine still holds it. Counters are
//! atomics because the engine may inspect from any thread.

use crate::engine::{FullScanScriptInspector, KeychainKind, Script, SyncScriptInspector};
use crate::wallet::sync::state::ViewStateSink;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Log every N inspected scripts
const LOG_INTERVAL: u64 = 100;

/// `inspected / total` clamped to [0, 1], or 0 when the total is unknown.
pub fn fraction(inspected: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    (inspected as f64 / total as f64).clamp(0.0, 1.0) as f32
}

/// Progress adapter for incremental sync.
#[derive(Debug)]
pub struct SyncProgressInspector {
    inspected: AtomicU64,
    total: AtomicU64,
    sink: ViewStateSink,
    epoch: u64,
}

impl SyncProgressInspector {
    pub(crate) fn new(sink: ViewStateSink) -> Self {
        let epoch = sink.start_progress();
        Self {
            inspected: AtomicU64::new(0),
            total: AtomicU64::new(0),
            sink,
            epoch,
        }
    }

    /// Stop forwarding inspections to the view.
    pub(crate) fn retire(&self) {
        self.sink.retire_progress(self.epoch);
    }

    /// Last reported `(inspected, total)`.
    pub fn progress(&self) -> (u64, u64) {
        (
            self.inspected.load(Ordering::SeqCst),
            self.total.load(Ordering::SeqCst),
        )
    }
}

impl SyncScriptInspector for SyncProgressInspector {
    fn inspect(&self, _script: &Script, total: u64) {
        if !self.sink.is_current_progress(self.epoch) {
            return;
        }
        self.total.store(total, Ordering::SeqCst);
        let inspected = self.inspected.fetch_add(1, Ordering::SeqCst) + 1;

        if inspected % LOG_INTERVAL == 0 {
            debug!("Sync progress: {} of {} scripts inspected", inspected, total);
        }

        self.sink.update_progress(self.epoch, |state| {
            // Callbacks from different threads may arrive out of order.
            state.inspected_scripts = state.inspected_scripts.max(inspected);
            state.total_scripts = total;
            state.progress = fraction(state.inspected_scripts, total);
        });
    }
}

/// Progress adapter for full scans.
#[derive(Debug)]
pub struct FullScanProgressInspector {
    inspected: AtomicU64,
    sink: ViewStateSink,
    epoch: u64,
}

impl FullScanProgressInspector {
    pub(crate) fn new(sink: ViewStateSink) -> Self {
        let epoch = sink.start_progress();
        Self {
            inspected: AtomicU64::new(0),
            sink,
            epoch,
        }
    }

    pub(crate) fn retire(&self) {
        self.sink.retire_progress(self.epoch);
    }

    pub fn inspected(&self) -> u64 {
        self.inspected.load(Ordering::SeqCst)
    }
}

impl FullScanScriptInspector for FullScanProgressInspector {
    fn inspect(&self, keychain: KeychainKind, index: u32, _script: &Script) {
        if !self.sink.is_current_progress(self.epoch) {
            return;
        }
        let inspected = self.inspected.fetch_add(1, Ordering::SeqCst) + 1;

        if inspected % LOG_INTERVAL == 0 {
            debug!(
                "Full scan progress: {} scripts inspected (last {:?}/{})",
                inspected, keychain, index
            );
        }

        self.sink.update_progress(self.epoch, |state| {
            state.inspected_scripts = state.inspected_scripts.max(inspected);
        });
    }
}
