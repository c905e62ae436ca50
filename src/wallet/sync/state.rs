//! Observable wallet view state.
//!
//! All fields the presentation layer reads live in one [`WalletViewState`] value published through a
//! `tokio::sync::watch` channel. [`ViewStateSink`] is the only handle that can write to it; every
//! mutation goes through `send_modify`, so updates coming from the orchestrator and from inspector
//! callbacks on engine threads are applied one at a time and observed atomically by readers.
//!
//! Script counters belong to one progress epoch at a time. A progress adapter writes only while its
//! epoch is current, so an adapter abandoned by a timed-out call cannot touch a later call's
//! counters.

use crate::engine::CanonicalTx;
use crate::error::{AppError, EngineError};
use crate::price::sats_to_usd;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Synchronization status of the wallet session.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum WalletSyncState {
    #[default]
    NotStarted,
    Syncing,
    Synced,
    /// The last sync failed; carries the original cause.
    Error(EngineError),
}

impl WalletSyncState {
    pub fn is_error(&self) -> bool {
        matches!(self, WalletSyncState::Error(_))
    }
}

/// Everything the wallet view shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalletViewState {
    /// Total balance in satoshis
    pub balance_total: u64,
    pub transactions: Vec<CanonicalTx>,
    /// USD per BTC
    pub price: f64,
    /// Sample time of `price`, unix seconds
    pub time: Option<i64>,
    pub sync_state: WalletSyncState,
    /// Incremental sync progress in [0, 1]
    pub progress: f32,
    pub inspected_scripts: u64,
    pub total_scripts: u64,
    pub wallet_view_error: Option<AppError>,
    /// Set whenever an error is reported; cleared only by the consumer.
    pub showing_wallet_view_error_alert: bool,
}

impl WalletViewState {
    /// The first `limit` transactions.
    pub fn recent_transactions(&self, limit: usize) -> &[CanonicalTx] {
        let end = limit.min(self.transactions.len());
        &self.transactions[..end]
    }

    /// Balance valued in USD at the last fetched price.
    pub fn sats_price(&self) -> f64 {
        sats_to_usd(self.balance_total, self.price)
    }
}

/// Single writer for [`WalletViewState`].
#[derive(Debug, Clone)]
pub struct ViewStateSink {
    sender: Arc<watch::Sender<WalletViewState>>,
    progress_epoch: Arc<AtomicU64>,
}

impl ViewStateSink {
    pub(crate) fn new(initial: WalletViewState) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
            progress_epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Apply `modify` under exclusive access and notify readers.
    pub(crate) fn update<F>(&self, modify: F)
    where
        F: FnOnce(&mut WalletViewState),
    {
        self.sender.send_modify(modify);
    }

    pub(crate) fn set_sync_state(&self, sync_state: WalletSyncState) {
        self.update(|state| state.sync_state = sync_state);
    }

    /// Publish a user-facing error and raise the alert flag.
    pub(crate) fn report_error(&self, error: AppError) {
        self.update(|state| {
            state.wallet_view_error = Some(error);
            state.showing_wallet_view_error_alert = true;
        });
    }

    /// Zero the script counters and open a new progress epoch, returning it.
    pub(crate) fn start_progress(&self) -> u64 {
        let mut epoch = 0;
        self.sender.send_modify(|state| {
            epoch = self.progress_epoch.fetch_add(1, Ordering::SeqCst) + 1;
            state.inspected_scripts = 0;
            state.total_scripts = 0;
            state.progress = 0.0;
        });
        epoch
    }

    /// Close `epoch` if it is still current. Later writes tagged with it are dropped.
    pub(crate) fn retire_progress(&self, epoch: u64) {
        self.sender.send_if_modified(|_| {
            let _ = self.progress_epoch.compare_exchange(
                epoch,
                epoch + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            );
            false
        });
    }

    pub(crate) fn is_current_progress(&self, epoch: u64) -> bool {
        self.progress_epoch.load(Ordering::SeqCst) == epoch
    }

    /// Apply a progress write if `epoch` is still current. Returns whether it was applied.
    pub(crate) fn update_progress<F>(&self, epoch: u64, modify: F) -> bool
    where
        F: FnOnce(&mut WalletViewState),
    {
        self.sender.send_if_modified(|state| {
            if self.progress_epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            modify(state);
            true
        })
    }

    /// Lower the alert flag once the consumer has shown the error.
    pub fn dismiss_error(&self) {
        self.sender
            .send_if_modified(|state| std::mem::take(&mut state.showing_wallet_view_error_alert));
    }

    pub fn subscribe(&self) -> watch::Receiver<WalletViewState> {
        self.sender.subscribe()
    }

    pub fn snapshot(&self) -> WalletViewState {
        self.sender.borrow().clone()
    }
}
