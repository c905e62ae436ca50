//! A scriptable in-memory wallet engine.
//!
//! `FakeWalletClient` replays a configured plan for every capability of [`WalletClient`] and counts
//! how often each one was used. It backs the unit tests and the demo binary.

use super::client::{FullScanScriptInspector, NodeEventHandler, SyncScriptInspector, WalletClient};
use super::types::*;
use crate::error::EngineError;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// What a full scan does when invoked.
#[derive(Debug, Clone, Default)]
pub struct FullScanPlan {
	/// Scripts reported to the inspector before finishing
	pub scripts: u64,
	/// Returned after all scripts were inspected
	pub failure: Option<EngineError>,
}

/// What an incremental sync does when invoked.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
	pub inspected: u64,
	pub total: u64,
	pub failure: Option<EngineError>,
}

/// One scripted pass of the event-driven sync.
#[derive(Debug, Clone, Default)]
pub struct NodePass {
	pub states: Vec<NodeState>,
	pub warnings: Vec<Warning>,
	pub failure: Option<EngineError>,
}

/// Inspections the engine keeps making from its own thread after a sync call was abandoned.
///
/// The call that picks this up never returns, so only a timeout ends it.
#[derive(Debug, Clone)]
pub struct DetachedInspection {
	/// Wait before the first inspection
	pub after: Duration,
	pub inspected: u64,
	pub total: u64,
}

impl NodePass {
	pub fn with_states(states: impl IntoIterator<Item = NodeState>) -> Self {
		Self {
			states: states.into_iter().collect(),
			..Default::default()
		}
	}
}

pub struct FakeWalletClient {
	network: Network,
	needs_full_scan: AtomicBool,
	tip: AtomicU32,
	delay: Option<Duration>,
	balance: Mutex<Result<Balance, EngineError>>,
	transactions: Mutex<Result<Vec<CanonicalTx>, EngineError>>,
	backup_info: Option<BackupInfo>,
	full_scan_plan: Mutex<FullScanPlan>,
	sync_plan: Mutex<SyncPlan>,
	detached: Mutex<Option<DetachedInspection>>,
	node_passes: Mutex<VecDeque<NodePass>>,
	full_scan_calls: AtomicU64,
	sync_calls: AtomicU64,
	node_sync_calls: AtomicU64,
	balance_reads: AtomicU64,
	transaction_reads: AtomicU64,
	in_flight: AtomicU64,
	peak_in_flight: AtomicU64,
}

impl FakeWalletClient {
	pub fn new(network: Network) -> Self {
		Self {
			network,
			needs_full_scan: AtomicBool::new(false),
			tip: AtomicU32::new(0),
			delay: None,
			balance: Mutex::new(Ok(Balance::default())),
			transactions: Mutex::new(Ok(Vec::new())),
			backup_info: None,
			full_scan_plan: Mutex::new(FullScanPlan::default()),
			sync_plan: Mutex::new(SyncPlan::default()),
			detached: Mutex::new(None),
			node_passes: Mutex::new(VecDeque::new()),
			full_scan_calls: AtomicU64::new(0),
			sync_calls: AtomicU64::new(0),
			node_sync_calls: AtomicU64::new(0),
			balance_reads: AtomicU64::new(0),
			transaction_reads: AtomicU64::new(0),
			in_flight: AtomicU64::new(0),
			peak_in_flight: AtomicU64::new(0),
		}
	}

	pub fn with_needs_full_scan(self, value: bool) -> Self {
		self.needs_full_scan.store(value, Ordering::SeqCst);
		self
	}

	pub fn with_tip(self, tip: u32) -> Self {
		self.tip.store(tip, Ordering::SeqCst);
		self
	}

	/// Sleep this long at the start of every sync call.
	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);
		self
	}

	pub fn with_balance(self, balance: Balance) -> Self {
		*lock(&self.balance) = Ok(balance);
		self
	}

	pub fn with_balance_error(self, error: EngineError) -> Self {
		*lock(&self.balance) = Err(error);
		self
	}

	pub fn with_transactions(self, transactions: Vec<CanonicalTx>) -> Self {
		*lock(&self.transactions) = Ok(transactions);
		self
	}

	pub fn with_backup_info(mut self, backup_info: BackupInfo) -> Self {
		self.backup_info = Some(backup_info);
		self
	}

	pub fn with_full_scan(self, plan: FullScanPlan) -> Self {
		*lock(&self.full_scan_plan) = plan;
		self
	}

	pub fn with_sync(self, plan: SyncPlan) -> Self {
		*lock(&self.sync_plan) = plan;
		self
	}

	/// Make the next incremental sync hang and inspect from a detached thread instead.
	pub fn with_detached_inspection(self, detached: DetachedInspection) -> Self {
		*lock(&self.detached) = Some(detached);
		self
	}

	pub fn with_node_passes(self, passes: impl IntoIterator<Item = NodePass>) -> Self {
		lock(&self.node_passes).extend(passes);
		self
	}

	pub fn full_scan_calls(&self) -> u64 {
		self.full_scan_calls.load(Ordering::SeqCst)
	}

	pub fn sync_calls(&self) -> u64 {
		self.sync_calls.load(Ordering::SeqCst)
	}

	pub fn node_sync_calls(&self) -> u64 {
		self.node_sync_calls.load(Ordering::SeqCst)
	}

	pub fn balance_reads(&self) -> u64 {
		self.balance_reads.load(Ordering::SeqCst)
	}

	pub fn transaction_reads(&self) -> u64 {
		self.transaction_reads.load(Ordering::SeqCst)
	}

	/// Highest number of sync calls that were running at the same time.
	pub fn peak_concurrency(&self) -> u64 {
		self.peak_in_flight.load(Ordering::SeqCst)
	}

	fn enter(&self) -> InFlight<'_> {
		let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
		self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
		InFlight {
			counter: &self.in_flight,
		}
	}

	async fn pause(&self) {
		if let Some(delay) = self.delay {
			tokio::time::sleep(delay).await;
		}
	}
}

struct InFlight<'a> {
	counter: &'a AtomicU64,
}

impl Drop for InFlight<'_> {
	fn drop(&mut self) {
		self.counter.fetch_sub(1, Ordering::SeqCst);
	}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn script_for(index: u64) -> Script {
	Script(index.to_be_bytes().to_vec())
}

#[async_trait::async_trait]
impl WalletClient for FakeWalletClient {
	fn network(&self) -> Network {
		self.network
	}

	fn balance(&self) -> Result<Balance, EngineError> {
		self.balance_reads.fetch_add(1, Ordering::SeqCst);
		lock(&self.balance).clone()
	}

	fn transactions(&self) -> Result<Vec<CanonicalTx>, EngineError> {
		self.transaction_reads.fetch_add(1, Ordering::SeqCst);
		lock(&self.transactions).clone()
	}

	fn needs_full_scan(&self) -> bool {
		self.needs_full_scan.load(Ordering::SeqCst)
	}

	fn set_needs_full_scan(&self, value: bool) {
		self.needs_full_scan.store(value, Ordering::SeqCst);
	}

	async fn full_scan_with_inspector(
		&self,
		inspector: Arc<dyn FullScanScriptInspector>,
	) -> Result<(), EngineError> {
		self.full_scan_calls.fetch_add(1, Ordering::SeqCst);
		let _in_flight = self.enter();
		let plan = lock(&self.full_scan_plan).clone();
		self.pause().await;

		debug!("Fake full scan inspecting {} scripts", plan.scripts);
		for index in 0..plan.scripts {
			inspector.inspect(KeychainKind::External, index as u32, &script_for(index));
		}

		match plan.failure {
			Some(error) => Err(error),
			None => Ok(()),
		}
	}

	async fn sync_with_inspector(
		&self,
		inspector: Arc<dyn SyncScriptInspector>,
	) -> Result<(), EngineError> {
		self.sync_calls.fetch_add(1, Ordering::SeqCst);
		let _in_flight = self.enter();

		let detached = lock(&self.detached).take();
		if let Some(detached) = detached {
			std::thread::spawn(move || {
				std::thread::sleep(detached.after);
				for index in 0..detached.inspected {
					inspector.inspect(&script_for(index), detached.total);
				}
			});
			return std::future::pending().await;
		}

		let plan = lock(&self.sync_plan).clone();
		self.pause().await;

		debug!(
			"Fake sync inspecting {} of {} scripts",
			plan.inspected, plan.total
		);
		for index in 0..plan.inspected {
			inspector.inspect(&script_for(index), plan.total);
		}

		match plan.failure {
			Some(error) => Err(error),
			None => Ok(()),
		}
	}

	async fn sync(&self, handler: Arc<dyn NodeEventHandler>) -> Result<(), EngineError> {
		self.node_sync_calls.fetch_add(1, Ordering::SeqCst);
		let _in_flight = self.enter();
		let pass = lock(&self.node_passes).pop_front();
		self.pause().await;

		let Some(pass) = pass else {
			return Err(EngineError::CannotConnect(
				"no peers available".to_string(),
			));
		};

		handler.connections_met();
		for warning in pass.warnings {
			handler.warning(warning);
		}
		for state in pass.states {
			handler.state_changed(state);
		}

		if let Some(error) = pass.failure {
			return Err(error);
		}

		handler.synced(self.tip.load(Ordering::SeqCst));
		Ok(())
	}

	fn backup_info(&self) -> Result<BackupInfo, EngineError> {
		self.backup_info
			.clone()
			.ok_or_else(|| EngineError::Wallet("no backup information stored".to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn backup_info_is_returned_when_stored() {
		let backup = BackupInfo {
			mnemonic: "abandon ability able".to_string(),
			descriptor: "wpkh(tprv/84'/1'/0'/0/*)".to_string(),
			change_descriptor: "wpkh(tprv/84'/1'/0'/1/*)".to_string(),
		};
		let client = FakeWalletClient::new(Network::Testnet).with_backup_info(backup.clone());

		assert_eq!(client.backup_info(), Ok(backup));
	}

	#[test]
	fn missing_backup_info_is_a_wallet_error() {
		let client = FakeWalletClient::new(Network::Testnet);

		assert!(matches!(client.backup_info(), Err(EngineError::Wallet(_))));
	}
}
