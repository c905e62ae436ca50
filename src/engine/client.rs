//! Capabilities the orchestrator consumes from the wallet engine.

use super::types::*;
use crate::error::EngineError;
use std::sync::Arc;

/// Receives one call per script checked during an incremental sync.
pub trait SyncScriptInspector: Send + Sync {
	/// `total` is the engine's current estimate of scripts to inspect; the latest value wins.
	fn inspect(&self, script: &Script, total: u64);
}

/// Receives one call per script derived and checked during a full scan.
pub trait FullScanScriptInspector: Send + Sync {
	fn inspect(&self, keychain: KeychainKind, index: u32, script: &Script);
}

/// Receives lifecycle notifications from a peer-connected sync node.
pub trait NodeEventHandler: Send + Sync {
	fn blocks_disconnected(&self, blocks: &[u32]);

	fn connections_met(&self);

	fn dialog(&self, dialog: &str);

	fn state_changed(&self, state: NodeState);

	fn synced(&self, tip: u32);

	fn tx_failed(&self, txid: Txid);

	fn tx_sent(&self, txid: Txid);

	fn warning(&self, warning: Warning);
}

/// The wallet engine as seen by the sync orchestrator.
///
/// Implementations own balance computation, the transaction store, descriptors and network
/// persistence. Sync calls may suspend while the engine performs network or database work.
#[async_trait::async_trait]
pub trait WalletClient: Send + Sync + 'static {
	fn network(&self) -> Network;

	fn balance(&self) -> Result<Balance, EngineError>;

	/// Wallet transactions in canonical order.
	fn transactions(&self) -> Result<Vec<CanonicalTx>, EngineError>;

	fn needs_full_scan(&self) -> bool;

	fn set_needs_full_scan(&self, value: bool);

	async fn full_scan_with_inspector(
		&self,
		inspector: Arc<dyn FullScanScriptInspector>,
	) -> Result<(), EngineError>;

	async fn sync_with_inspector(
		&self,
		inspector: Arc<dyn SyncScriptInspector>,
	) -> Result<(), EngineError>;

	/// Run one event-driven sync pass, reporting through `handler`.
	async fn sync(&self, handler: Arc<dyn NodeEventHandler>) -> Result<(), EngineError>;

	fn backup_info(&self) -> Result<BackupInfo, EngineError>;
}
