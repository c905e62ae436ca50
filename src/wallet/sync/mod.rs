//! Wallet Synchronization Module
//!
//! This module provides the logic for bringing a wallet up to date with the chain and keeping it
//! there. It is composed of several submodules, each responsible for a specific aspect of the sync
//! process:
//!
//! - `orchestrator`: The main entry point. Chooses between full scan and incremental sync, drives the
//!   chosen operation and classifies every failure into an `AppError`.
//! - `progress`: The two script-inspection adapters that turn per-script callbacks into aggregate
//!   progress.
//! - `events`: The node event handler that maps discrete node phases to coarse progress and logs
//!   warnings.
//! - `continuous`: The cancellable background loop of event-driven sync passes.
//! - `state`: The observable wallet view state and its single writer.
//!
//! All state the presentation layer reads flows through `state::ViewStateSink`, so the orchestrator
//! and the adapters never hand out mutable access to it.

/// Cancellable continuous sync loop
pub mod continuous;
/// Node event handling for the continuous loop
pub mod events;
/// Main coordinator for wallet sync
pub mod orchestrator;
/// Script inspection progress adapters
pub mod progress;
/// Observable wallet view state
pub mod state;

pub use continuous::ContinuousSync;
pub use events::{BroadcastNotice, BroadcastStatus, NodeProgress, NodeProgressHandler};
pub use orchestrator::*;
pub use progress::{FullScanProgressInspector, SyncProgressInspector, fraction};
pub use state::{ViewStateSink, WalletSyncState, WalletViewState};
