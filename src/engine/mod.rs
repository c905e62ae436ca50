//! Wallet engine boundary.
//!
//! The engine itself (balance computation, transaction store, descriptors, chain access) lives
//! outside this crate. This module defines the values and capabilities the orchestrator consumes,
//! plus a scriptable fake used by tests and the demo binary.

/// Capability traits implemented by the wallet engine
mod client;
/// Scriptable in-memory engine
pub mod fake;
/// Values exchanged with the engine
mod types;

pub use client::{FullScanScriptInspector, NodeEventHandler, SyncScriptInspector, WalletClient};
pub use types::*;
