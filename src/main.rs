use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use wallet_chain_sync::engine::fake::{FakeWalletClient, FullScanPlan, NodePass, SyncPlan};
use wallet_chain_sync::engine::{Balance, CanonicalTx, ChainPosition, Network, NodeState, Txid};
use wallet_chain_sync::price::HttpPriceClient;
use wallet_chain_sync::{ContinuousSync, NodeProgressHandler, SyncConfig, WalletSyncOrchestrator};

#[tokio::main(flavor = "current_thread")]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	info!("Starting wallet sync service");

	let config = match SyncConfig::from_env() {
		Ok(config) => config,
		Err(e) => {
			error!("Invalid configuration: {}", e);
			return;
		}
	};

	let price_client = match HttpPriceClient::new(config.price_url.clone(), config.http_timeout) {
		Ok(client) => client,
		Err(e) => {
			error!("Failed to create price client: {}", e);
			return;
		}
	};

	let wallet_client = Arc::new(demo_wallet());
	let orchestrator = Arc::new(WalletSyncOrchestrator::new(
		wallet_client,
		Arc::new(price_client),
		config,
	));

	info!("Created orchestrator for {}", orchestrator.network());

	match orchestrator.sync_or_full_scan().await {
		Ok(mode) => info!("Initial {} finished", mode),
		Err(e) => error!("Initial sync failed: {}", e),
	}

	if let Err(e) = orchestrator.get_balance() {
		warn!("Could not read balance: {}", e);
	}
	if let Err(e) = orchestrator.get_transactions() {
		warn!("Could not read transactions: {}", e);
	}
	if let Err(e) = orchestrator.get_prices().await {
		warn!("Could not fetch price: {}", e);
	}

	let state = orchestrator.snapshot();
	info!(
		"Balance: {} sats (~{:.2} USD), {} transactions, {} recent",
		state.balance_total,
		state.sats_price(),
		state.transactions.len(),
		orchestrator.recent_transactions().len()
	);

	let handler = Arc::new(NodeProgressHandler::with_broadcast_history(
		orchestrator.config().broadcast_history_limit,
	));
	let shutdown = CancellationToken::new();
	let sync = ContinuousSync::spawn(orchestrator.clone(), handler.clone(), shutdown.clone());

	let mut node_progress = handler.subscribe();
	let progress_task = tokio::spawn(async move {
		while node_progress.changed().await.is_ok() {
			let progress = node_progress.borrow_and_update().progress;
			info!("Node sync progress: {}%", progress);
		}
	});

	info!("Continuous sync running, press Ctrl-C to stop");
	if let Err(e) = tokio::signal::ctrl_c().await {
		error!("Error waiting for ctrl_c: {}", e);
	}
	info!("Shutdown signal received");

	if let Err(e) = sync.stop().await {
		error!("Continuous sync ended with error: {}", e);
	}
	progress_task.abort();

	info!(
		"Stopped at height {:?} with sync state {:?}",
		handler.height(),
		orchestrator.snapshot().sync_state
	);
}

/// A wallet engine that replays a short, plausible sync history.
fn demo_wallet() -> FakeWalletClient {
	let transactions = (1..=8u8)
		.map(|i| CanonicalTx {
			txid: Txid([i; 32]),
			chain_position: ChainPosition::Confirmed {
				height: 200_000 + i as u32,
				timestamp: 1_700_000_000 + i as u64 * 600,
			},
			sent: 0,
			received: 25_000 * i as u64,
		})
		.collect();

	FakeWalletClient::new(Network::Signet)
		.with_needs_full_scan(true)
		.with_delay(Duration::from_millis(750))
		.with_tip(200_010)
		.with_full_scan(FullScanPlan {
			scripts: 250,
			failure: None,
		})
		.with_sync(SyncPlan {
			inspected: 40,
			total: 40,
			failure: None,
		})
		.with_balance(Balance {
			confirmed: 900_000,
			..Default::default()
		})
		.with_transactions(transactions)
		.with_node_passes([
			NodePass::with_states([NodeState::Behind, NodeState::HeadersSynced]),
			NodePass::with_states([NodeState::FilterHeadersSynced, NodeState::FiltersSynced]),
			NodePass::with_states([NodeState::TransactionsSynced]),
		])
}
