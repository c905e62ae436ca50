//! Wallet chain synchronization.
//!
//! Coordinates how a wallet is brought up to date with the chain: full scan or incremental sync,
//! progress reporting, a cancellable continuous sync loop, and classification of every engine
//! failure into a single user-facing [`error::AppError`].

pub mod config;
pub mod engine;
pub mod error;
pub mod price;
pub mod wallet;

pub use config::SyncConfig;
pub use error::{AppError, EngineError, SyncMode};
pub use wallet::{
	ContinuousSync, NodeProgressHandler, WalletSyncOrchestrator, WalletSyncState, WalletViewState,
};
