/// Sync orchestration, progress reporting and the continuous loop
pub mod sync;

pub use sync::{
	ContinuousSync, NodeProgressHandler, WalletSyncOrchestrator, WalletSyncState, WalletViewState,
};
