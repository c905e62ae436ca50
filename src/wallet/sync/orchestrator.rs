//! Wallet sync orchestrator.
//!
//! This module defines the `WalletSyncOrchestrator`, which decides how the wallet is brought up to
//! date with the chain and drives the chosen operation to completion.
//!
//! The orchestrator is responsible for:
//! - Choosing between a full scan and an incremental sync from the engine's `needs_full_scan` flag
//! - Building a fresh progress adapter for every engine call
//! - Transitioning the wallet's `WalletSyncState` and publishing progress to the view state
//! - Classifying every engine failure, reporting it as an `AppError` and raising the alert flag
//! - Refreshing balance, transactions and price for the view
//!
//! Sync-producing calls are serialized by an in-flight guard, so at most one of incremental sync,
//! full scan or a continuous pass (see `continuous`) runs against the wallet at any time.

use crate::config::SyncConfig;
use crate::engine::{CanonicalTx, Network, NodeEventHandler, WalletClient};
use crate::error::{AppError, EngineError, FailureClass, SyncMode};
use crate::price::{Price, PriceClient};
use crate::wallet::sync::{
	progress::{FullScanProgressInspector, SyncProgressInspector},
	state::{ViewStateSink, WalletSyncState, WalletViewState},
};

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{error, info, warn};

/// Main wallet sync orchestrator.
///
/// Owns the only writer of the wallet view state. Presentation code reads through
/// [`WalletSyncOrchestrator::subscribe`] or [`WalletSyncOrchestrator::snapshot`].
pub struct WalletSyncOrchestrator<C: WalletClient> {
	client: Arc<C>,
	price_client: Arc<dyn PriceClient>,
	view: ViewStateSink,
	config: SyncConfig,
	in_flight: Mutex<()>,
}

impl<C: WalletClient> WalletSyncOrchestrator<C> {
	pub fn new(client: Arc<C>, price_client: Arc<dyn PriceClient>, config: SyncConfig) -> Self {
		Self::with_state(client, price_client, config, WalletViewState::default())
	}

	/// Create an orchestrator that starts from an existing view state.
	pub fn with_state(
		client: Arc<C>,
		price_client: Arc<dyn PriceClient>,
		config: SyncConfig,
		initial: WalletViewState,
	) -> Self {
		Self {
			client,
			price_client,
			view: ViewStateSink::new(initial),
			config,
			in_flight: Mutex::new(()),
		}
	}

	pub fn client(&self) -> &Arc<C> {
		&self.client
	}

	pub fn config(&self) -> &SyncConfig {
		&self.config
	}

	pub fn network(&self) -> Network {
		self.client.network()
	}

	pub fn subscribe(&self) -> watch::Receiver<WalletViewState> {
		self.view.subscribe()
	}

	pub fn snapshot(&self) -> WalletViewState {
		self.view.snapshot()
	}

	/// The first `recent_transactions_limit` transactions of the last refresh.
	pub fn recent_transactions(&self) -> Vec<CanonicalTx> {
		self.view
			.snapshot()
			.recent_transactions(self.config.recent_transactions_limit)
			.to_vec()
	}

	/// Acknowledge the current error alert.
	pub fn dismiss_error(&self) {
		self.view.dismiss_error();
	}

	/// Bring the wallet up to date, choosing the strategy from the engine's full-scan flag.
	///
	/// A successful full scan clears the flag so later calls sync incrementally. A failed one
	/// leaves it set so the scan is retried.
	pub async fn sync_or_full_scan(&self) -> Result<SyncMode, AppError> {
		let _guard = self.in_flight.lock().await;

		if self.client.needs_full_scan() {
			self.run_full_scan().await?;
			self.client.set_needs_full_scan(false);
			Ok(SyncMode::FullScan)
		} else {
			self.run_sync().await?;
			Ok(SyncMode::Incremental)
		}
	}

	/// Run a full scan, returning the number of inspected scripts.
	pub async fn full_scan_with_progress(&self) -> Result<u64, AppError> {
		let _guard = self.in_flight.lock().await;
		self.run_full_scan().await
	}

	/// Run an incremental sync, returning the final `(inspected, total)`.
	pub async fn sync_with_progress(&self) -> Result<(u64, u64), AppError> {
		let _guard = self.in_flight.lock().await;
		self.run_sync().await
	}

	/// Refresh the balance total from the engine.
	pub fn get_balance(&self) -> Result<u64, AppError> {
		match self.client.balance() {
			Ok(balance) => {
				let total = balance.total();
				self.view.update(|state| state.balance_total = total);
				Ok(total)
			}
			Err(error) => Err(self.report(&error)),
		}
	}

	/// Refresh the transaction list from the engine.
	pub fn get_transactions(&self) -> Result<usize, AppError> {
		match self.client.transactions() {
			Ok(transactions) => {
				let count = transactions.len();
				self.view.update(|state| state.transactions = transactions);
				Ok(count)
			}
			Err(error) => Err(self.report(&error)),
		}
	}

	/// Refresh the fiat price.
	pub async fn get_prices(&self) -> Result<Price, AppError> {
		match self.price_client.fetch_price().await {
			Ok(price) => {
				info!(
					"Price updated: {} USD (sampled at {})",
					price.usd,
					price
						.sampled_at()
						.map(|at| at.to_rfc3339())
						.unwrap_or_else(|| price.time.to_string())
				);
				self.view.update(|state| {
					state.price = price.usd;
					state.time = Some(price.time);
				});
				Ok(price)
			}
			Err(error) => {
				warn!("Failed to fetch price: {}", error);
				let app_error = AppError::from(error);
				self.view.report_error(app_error.clone());
				Err(app_error)
			}
		}
	}

	async fn run_full_scan(&self) -> Result<u64, AppError> {
		info!("Starting full scan");
		self.begin_sync();

		let inspector = Arc::new(FullScanProgressInspector::new(self.view.clone()));
		let result = self
			.bounded(self.client.full_scan_with_inspector(inspector.clone()))
			.await;
		inspector.retire();

		match result {
			Ok(()) => {
				let inspected = inspector.inspected();
				self.view.set_sync_state(WalletSyncState::Synced);
				info!("Full scan completed: {} scripts inspected", inspected);
				Ok(inspected)
			}
			Err(error) => Err(self.record_failure(SyncMode::FullScan, error)),
		}
	}

	async fn run_sync(&self) -> Result<(u64, u64), AppError> {
		info!("Starting incremental sync");
		self.begin_sync();

		let inspector = Arc::new(SyncProgressInspector::new(self.view.clone()));
		let result = self
			.bounded(self.client.sync_with_inspector(inspector.clone()))
			.await;
		inspector.retire();

		match result {
			Ok(()) => {
				let (inspected, total) = inspector.progress();
				self.view.set_sync_state(WalletSyncState::Synced);
				info!(
					"Incremental sync completed: {} of {} scripts inspected",
					inspected, total
				);
				Ok((inspected, total))
			}
			Err(error) => Err(self.record_failure(SyncMode::Incremental, error)),
		}
	}

	/// Run one event-driven sync pass and refresh the view after it succeeds.
	///
	/// Used by the continuous loop; holds the in-flight guard for the pass only.
	pub(crate) async fn run_node_pass(
		&self,
		handler: Arc<dyn NodeEventHandler>,
	) -> Result<(), AppError> {
		let result = {
			let _guard = self.in_flight.lock().await;
			self.bounded(self.client.sync(handler)).await
		};

		match result {
			Ok(()) => {
				self.view.set_sync_state(WalletSyncState::Synced);
				// Refresh failures are reported to the view and do not fail the pass.
				let _ = self.get_balance();
				let _ = self.get_transactions();
				Ok(())
			}
			Err(error) => Err(self.record_failure(SyncMode::NodeSync, error)),
		}
	}

	fn begin_sync(&self) {
		self.view.set_sync_state(WalletSyncState::Syncing);
	}

	/// Apply the configured time bound to an engine call.
	async fn bounded<F>(&self, operation: F) -> Result<(), EngineError>
	where
		F: Future<Output = Result<(), EngineError>>,
	{
		match self.config.sync_timeout {
			Some(limit) => tokio::time::timeout(limit, operation)
				.await
				.map_err(|_| EngineError::Timeout(limit))?,
			None => operation.await,
		}
	}

	/// Report a sync failure and move the sync state to `Error`.
	fn record_failure(&self, mode: SyncMode, error: EngineError) -> AppError {
		match error.classify(mode) {
			FailureClass::Recognized => warn!("{} failed: {}", mode, error),
			FailureClass::Residual => error!("{} failed with unexpected error: {}", mode, error),
		}

		let app_error = AppError::from(&error);
		self.view.update(|state| {
			state.sync_state = WalletSyncState::Error(error);
			state.wallet_view_error = Some(app_error.clone());
			state.showing_wallet_view_error_alert = true;
		});
		app_error
	}

	/// Report a non-sync failure without touching the sync state.
	fn report(&self, error: &EngineError) -> AppError {
		warn!("Wallet query failed: {}", error);
		let app_error = AppError::from(error);
		self.view.report_error(app_error.clone());
		app_error
	}
}
