//! Continuous background sync.
//!
//! [`ContinuousSync`] runs event-driven sync passes back to back on a spawned task. Every successful
//! pass marks the wallet `Synced` and refreshes balance and transactions. A failed pass is reported
//! like any other sync failure and retried after an exponential backoff.
//!
//! The loop stops when its [`CancellationToken`] is cancelled. Cancellation is observed between
//! passes and while waiting to retry; a pass that is already running is allowed to finish.

use crate::engine::{NodeEventHandler, WalletClient};
use crate::error::AppError;
use crate::wallet::sync::orchestrator::WalletSyncOrchestrator;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Handle to a running continuous sync task.
#[derive(Debug)]
pub struct ContinuousSync {
	cancellation: CancellationToken,
	handle: JoinHandle<Result<(), AppError>>,
}

impl ContinuousSync {
	/// Spawn the continuous loop on the current runtime.
	pub fn spawn<C: WalletClient>(
		orchestrator: Arc<WalletSyncOrchestrator<C>>,
		handler: Arc<dyn NodeEventHandler>,
		cancellation: CancellationToken,
	) -> Self {
		let token = cancellation.clone();
		let handle = tokio::spawn(async move {
			let result = orchestrator.run_continuous_sync(handler, token).await;
			if let Err(e) = &result {
				error!("Continuous sync stopped: {}", e);
			}
			result
		});

		Self {
			cancellation,
			handle,
		}
	}

	pub fn is_finished(&self) -> bool {
		self.handle.is_finished()
	}

	/// Cancel the loop and wait for the current pass to finish.
	pub async fn stop(self) -> Result<(), AppError> {
		self.cancellation.cancel();
		self.handle.await?
	}

	/// Wait for the loop to end on its own, by cancellation or by giving up on retries.
	pub async fn join(self) -> Result<(), AppError> {
		self.handle.await?
	}
}

impl<C: WalletClient> WalletSyncOrchestrator<C> {
	/// Run sync passes until `cancellation` fires.
	///
	/// Returns an error only when `retry_max_elapsed` is configured and retries are exhausted.
	pub async fn run_continuous_sync(
		&self,
		handler: Arc<dyn NodeEventHandler>,
		cancellation: CancellationToken,
	) -> Result<(), AppError> {
		info!("Starting continuous sync");
		let mut retry = self.retry_policy();
		let mut passes: u64 = 0;

		loop {
			if cancellation.is_cancelled() {
				info!("Continuous sync cancelled after {} passes", passes);
				return Ok(());
			}

			match self.run_node_pass(handler.clone()).await {
				Ok(()) => {
					passes += 1;
					retry.reset();
					debug!("Continuous sync pass {} completed", passes);
					// Passes that finish without suspending must not starve other tasks.
					tokio::task::yield_now().await;
				}
				Err(e) => {
					let Some(delay) = retry.next_backoff() else {
						error!("Giving up on continuous sync: {}", e);
						return Err(e);
					};

					warn!("Continuous sync pass failed, retrying in {:?}", delay);
					tokio::select! {
						_ = cancellation.cancelled() => {
							info!("Continuous sync cancelled while waiting to retry");
							return Ok(());
						}
						_ = tokio::time::sleep(delay) => {}
					}
				}
			}
		}
	}

	fn retry_policy(&self) -> ExponentialBackoff {
		let config = self.config();
		ExponentialBackoffBuilder::new()
			.with_initial_interval(config.retry_initial_interval)
			.with_max_interval(config.retry_max_interval)
			.with_max_elapsed_time(config.retry_max_elapsed)
			.build()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::SyncConfig;
	use crate::engine::fake::{FakeWalletClient, NodePass};
	use crate::engine::{Balance, Network, NodeState, Txid, Warning};
	use crate::error::{EngineError, PriceError};
	use crate::price::{Price, PriceClient};
	use crate::wallet::sync::events::NodeProgressHandler;
	use crate::wallet::sync::state::WalletSyncState;
	use std::sync::Mutex;
	use std::time::Duration;

	struct NoPrice;

	#[async_trait::async_trait]
	impl PriceClient for NoPrice {
		async fn fetch_price(&self) -> Result<Price, PriceError> {
			Err(PriceError::Status(reqwest::StatusCode::NOT_FOUND))
		}
	}

	/// Records the handler's progress after every state change.
	struct RecordingHandler {
		inner: NodeProgressHandler,
		seen: Mutex<Vec<u8>>,
	}

	impl RecordingHandler {
		fn new() -> Self {
			Self {
				inner: NodeProgressHandler::new(),
				seen: Mutex::new(Vec::new()),
			}
		}

		fn seen(&self) -> Vec<u8> {
			self.seen.lock().unwrap().clone()
		}
	}

	impl NodeEventHandler for RecordingHandler {
		fn blocks_disconnected(&self, blocks: &[u32]) {
			self.inner.blocks_disconnected(blocks);
		}

		fn connections_met(&self) {
			self.inner.connections_met();
		}

		fn dialog(&self, dialog: &str) {
			self.inner.dialog(dialog);
		}

		fn state_changed(&self, state: NodeState) {
			self.inner.state_changed(state);
			self.seen.lock().unwrap().push(self.inner.progress());
		}

		fn synced(&self, tip: u32) {
			self.inner.synced(tip);
		}

		fn tx_failed(&self, txid: Txid) {
			self.inner.tx_failed(txid);
		}

		fn tx_sent(&self, txid: Txid) {
			self.inner.tx_sent(txid);
		}

		fn warning(&self, warning: Warning) {
			self.inner.warning(warning);
		}
	}

	fn fast_retry() -> SyncConfig {
		SyncConfig {
			retry_initial_interval: Duration::from_millis(10),
			retry_max_interval: Duration::from_millis(20),
			..Default::default()
		}
	}

	fn orchestrator(
		client: FakeWalletClient,
		config: SyncConfig,
	) -> Arc<WalletSyncOrchestrator<FakeWalletClient>> {
		Arc::new(WalletSyncOrchestrator::new(
			Arc::new(client),
			Arc::new(NoPrice),
			config,
		))
	}

	#[tokio::test]
	async fn three_passes_report_progress_and_refresh_views() {
		let client = FakeWalletClient::new(Network::Signet)
			.with_tip(840_000)
			.with_balance(Balance {
				confirmed: 21_000,
				..Default::default()
			})
			.with_node_passes([
				NodePass::with_states([NodeState::Behind]),
				NodePass::with_states([NodeState::HeadersSynced]),
				NodePass::with_states([NodeState::TransactionsSynced]),
			]);
		let orchestrator = orchestrator(client, fast_retry());
		let handler = Arc::new(RecordingHandler::new());
		let mut view = orchestrator.subscribe();

		let sync = ContinuousSync::spawn(
			orchestrator.clone(),
			handler.clone(),
			CancellationToken::new(),
		);

		// The fourth pass finds no peers and raises the alert.
		tokio::time::timeout(
			Duration::from_secs(5),
			view.wait_for(|state| state.showing_wallet_view_error_alert),
		)
		.await
		.expect("alert raised")
		.expect("sender alive");

		sync.stop().await.unwrap();

		assert_eq!(handler.seen(), vec![20, 40, 100]);
		assert_eq!(handler.inner.height(), Some(840_000));
		assert_eq!(orchestrator.client().balance_reads(), 3);
		assert_eq!(orchestrator.client().transaction_reads(), 3);
		assert!(orchestrator.client().node_sync_calls() >= 4);

		let state = orchestrator.snapshot();
		assert_eq!(state.balance_total, 21_000);
		assert!(state.sync_state.is_error());
	}

	#[tokio::test]
	async fn successful_pass_marks_synced() {
		let client = FakeWalletClient::new(Network::Signet)
			.with_node_passes([NodePass::with_states([NodeState::FiltersSynced])]);
		let orchestrator = orchestrator(client, fast_retry());
		let handler = Arc::new(NodeProgressHandler::new());

		orchestrator.run_node_pass(handler.clone()).await.unwrap();

		assert_eq!(orchestrator.snapshot().sync_state, WalletSyncState::Synced);
		assert_eq!(handler.progress(), 80);
	}

	#[tokio::test]
	async fn warnings_do_not_fail_a_pass() {
		let client = FakeWalletClient::new(Network::Signet).with_node_passes([NodePass {
			states: vec![NodeState::TransactionsSynced],
			warnings: vec![
				Warning::NotEnoughConnections,
				Warning::PotentialStaleTip,
				Warning::FailedPersistence("header store busy".into()),
			],
			failure: None,
		}]);
		let orchestrator = orchestrator(client, fast_retry());
		let handler = Arc::new(NodeProgressHandler::new());

		orchestrator.run_node_pass(handler.clone()).await.unwrap();

		assert_eq!(handler.progress(), 100);
		assert!(!orchestrator.snapshot().showing_wallet_view_error_alert);
	}

	#[tokio::test]
	async fn cancelled_before_start_runs_no_pass() {
		let client = FakeWalletClient::new(Network::Signet);
		let orchestrator = orchestrator(client, fast_retry());
		let token = CancellationToken::new();
		token.cancel();

		let sync = ContinuousSync::spawn(
			orchestrator.clone(),
			Arc::new(NodeProgressHandler::new()),
			token,
		);

		sync.join().await.unwrap();
		assert_eq!(orchestrator.client().node_sync_calls(), 0);
		assert_eq!(orchestrator.snapshot().sync_state, WalletSyncState::NotStarted);
	}

	#[tokio::test]
	async fn cancellation_lets_the_running_pass_finish() {
		let client = FakeWalletClient::new(Network::Signet)
			.with_delay(Duration::from_millis(50))
			.with_node_passes([
				NodePass::with_states([NodeState::TransactionsSynced]),
				NodePass::with_states([NodeState::TransactionsSynced]),
			]);
		let orchestrator = orchestrator(client, fast_retry());

		let sync = ContinuousSync::spawn(
			orchestrator.clone(),
			Arc::new(NodeProgressHandler::new()),
			CancellationToken::new(),
		);

		tokio::time::timeout(Duration::from_secs(5), async {
			while orchestrator.client().node_sync_calls() < 1 {
				tokio::time::sleep(Duration::from_millis(1)).await;
			}
		})
		.await
		.expect("pass started");

		sync.stop().await.unwrap();

		assert_eq!(orchestrator.client().node_sync_calls(), 1);
		assert_eq!(orchestrator.snapshot().sync_state, WalletSyncState::Synced);
		assert_eq!(orchestrator.client().balance_reads(), 1);
	}

	#[tokio::test]
	async fn gives_up_when_retry_budget_exhausted() {
		let client = FakeWalletClient::new(Network::Signet).with_delay(Duration::from_millis(20));
		let config = SyncConfig {
			retry_max_elapsed: Some(Duration::from_millis(1)),
			..fast_retry()
		};
		let orchestrator = orchestrator(client, config);

		let sync = ContinuousSync::spawn(
			orchestrator.clone(),
			Arc::new(NodeProgressHandler::new()),
			CancellationToken::new(),
		);

		let error = tokio::time::timeout(Duration::from_secs(5), sync.join())
			.await
			.expect("loop ended")
			.unwrap_err();

		assert!(error.message.contains("no peers available"));
		assert_eq!(
			orchestrator.snapshot().sync_state,
			WalletSyncState::Error(EngineError::CannotConnect("no peers available".into()))
		);
	}

	#[tokio::test]
	async fn failed_pass_keeps_retrying_until_stopped() {
		let client = FakeWalletClient::new(Network::Signet);
		let orchestrator = orchestrator(client, fast_retry());

		let sync = ContinuousSync::spawn(
			orchestrator.clone(),
			Arc::new(NodeProgressHandler::new()),
			CancellationToken::new(),
		);

		tokio::time::timeout(Duration::from_secs(5), async {
			while orchestrator.client().node_sync_calls() < 3 {
				tokio::time::sleep(Duration::from_millis(5)).await;
			}
		})
		.await
		.expect("retried");

		assert!(!sync.is_finished());
		sync.stop().await.unwrap();
	}
}
