//! Node event handling for the continuous sync loop.
//!
//! The continuous loop does not see individual scripts. Instead the engine's sync node reports
//! coarse lifecycle events, and [`NodeProgressHandler`] turns them into an observable
//! [`NodeProgress`]: a 0-100 percentage derived from the current [`NodeState`], the last synced tip,
//! and broadcast outcomes. Warnings and diagnostics are logged and never interrupt the sync.

use crate::engine::{NodeEventHandler, NodeState, Txid, Warning};
use std::collections::VecDeque;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Percentage shown before the node reports its first phase.
pub const INITIAL_NODE_PROGRESS: u8 = NodeState::Behind.progress();

/// Broadcast notices kept by [`NodeProgressHandler::new`].
pub const DEFAULT_BROADCAST_HISTORY: usize = 50;

/// Outcome of a transaction broadcast reported by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastStatus {
    Sent,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastNotice {
    pub txid: Txid,
    pub status: BroadcastStatus,
}

/// Observable state derived from node events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeProgress {
    /// Coarse progress on a 0-100 scale
    pub progress: u8,
    /// Tip height from the last `synced` notice
    pub height: Option<u32>,
    /// Most recent broadcast outcomes in arrival order, oldest dropped first
    pub broadcasts: VecDeque<BroadcastNotice>,
}

impl Default for NodeProgress {
    fn default() -> Self {
        Self {
            progress: INITIAL_NODE_PROGRESS,
            height: None,
            broadcasts: VecDeque::new(),
        }
    }
}

/// [`NodeEventHandler`] that publishes [`NodeProgress`].
#[derive(Debug)]
pub struct NodeProgressHandler {
    sender: watch::Sender<NodeProgress>,
    broadcast_history: usize,
}

impl Default for NodeProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeProgressHandler {
    pub fn new() -> Self {
        Self::with_broadcast_history(DEFAULT_BROADCAST_HISTORY)
    }

    /// Keep at most `limit` broadcast notices.
    pub fn with_broadcast_history(limit: usize) -> Self {
        let (sender, _) = watch::channel(NodeProgress::default());
        Self {
            sender,
            broadcast_history: limit,
        }
    }

    pub fn progress(&self) -> u8 {
        self.sender.borrow().progress
    }

    pub fn height(&self) -> Option<u32> {
        self.sender.borrow().height
    }

    pub fn snapshot(&self) -> NodeProgress {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<NodeProgress> {
        self.sender.subscribe()
    }

    /// Remove and return the retained broadcast notices.
    pub fn take_broadcasts(&self) -> Vec<BroadcastNotice> {
        let mut taken = Vec::new();
        self.sender.send_if_modified(|state| {
            taken.extend(state.broadcasts.drain(..));
            !taken.is_empty()
        });
        taken
    }

    fn record_broadcast(&self, txid: Txid, status: BroadcastStatus) {
        if self.broadcast_history == 0 {
            return;
        }
        self.sender.send_modify(|state| {
            while state.broadcasts.len() >= self.broadcast_history {
                state.broadcasts.pop_front();
            }
            state.broadcasts.push_back(BroadcastNotice { txid, status });
        });
    }
}

impl NodeEventHandler for NodeProgressHandler {
    fn blocks_disconnected(&self, blocks: &[u32]) {
        debug!("{} blocks disconnected", blocks.len());
    }

    fn connections_met(&self) {
        debug!("Required peer connections met");
    }

    fn dialog(&self, dialog: &str) {
        info!("{}", dialog);
    }

    fn state_changed(&self, state: NodeState) {
        let progress = state.progress();
        let changed = self.sender.send_if_modified(|current| {
            if current.progress == progress {
                return false;
            }
            current.progress = progress;
            true
        });

        if changed {
            debug!("Node state changed to {:?} ({}%)", state, progress);
        }
    }

    fn synced(&self, tip: u32) {
        info!("Synced to {}", tip);
        self.sender.send_modify(|state| state.height = Some(tip));
    }

    fn tx_failed(&self, txid: Txid) {
        warn!("Transaction {} failed to broadcast", txid);
        self.record_broadcast(txid, BroadcastStatus::Failed);
    }

    fn tx_sent(&self, txid: Txid) {
        info!("Transaction {} sent", txid);
        self.record_broadcast(txid, BroadcastStatus::Sent);
    }

    fn warning(&self, warning: Warning) {
        warn!("{}", warning.description());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHASES: [(NodeState, u8); 5] = [
        (NodeState::Behind, 20),
        (NodeState::HeadersSynced, 40),
        (NodeState::FilterHeadersSynced, 60),
        (NodeState::FiltersSynced, 80),
        (NodeState::TransactionsSynced, 100),
    ];

    #[test]
    fn starts_at_initial_progress() {
        let handler = NodeProgressHandler::new();
        assert_eq!(handler.progress(), 20);
        assert_eq!(handler.height(), None);
    }

    #[test]
    fn each_phase_maps_to_its_percentage() {
        let handler = NodeProgressHandler::new();
        for (state, expected) in PHASES {
            handler.state_changed(state);
            assert_eq!(handler.progress(), expected);
        }
        // Order does not matter.
        for (state, expected) in PHASES.iter().rev() {
            handler.state_changed(*state);
            assert_eq!(handler.progress(), *expected);
        }
    }

    #[test]
    fn repeated_state_is_idempotent() {
        let handler = NodeProgressHandler::new();
        let mut receiver = handler.subscribe();

        handler.state_changed(NodeState::FiltersSynced);
        assert!(receiver.has_changed().unwrap());
        receiver.borrow_and_update();

        handler.state_changed(NodeState::FiltersSynced);
        handler.state_changed(NodeState::FiltersSynced);
        assert!(!receiver.has_changed().unwrap());
        assert_eq!(handler.progress(), 80);
    }

    #[test]
    fn warnings_and_dialogs_leave_progress_untouched() {
        let handler = NodeProgressHandler::new();
        handler.state_changed(NodeState::HeadersSynced);

        handler.warning(Warning::PeerTimedOut);
        handler.warning(Warning::FailedPersistence("database locked".into()));
        handler.warning(Warning::UnexpectedSyncError("reorg too deep".into()));
        handler.dialog("Connecting to 8 peers");
        handler.blocks_disconnected(&[100, 101]);
        handler.connections_met();

        assert_eq!(handler.progress(), 40);
    }

    #[test]
    fn synced_records_tip_height() {
        let handler = NodeProgressHandler::new();
        handler.synced(850_000);
        assert_eq!(handler.height(), Some(850_000));
    }

    #[test]
    fn broadcast_notices_are_surfaced() {
        let handler = NodeProgressHandler::new();
        handler.tx_sent(Txid([1; 32]));
        handler.tx_failed(Txid([2; 32]));

        assert_eq!(
            handler.snapshot().broadcasts,
            vec![
                BroadcastNotice {
                    txid: Txid([1; 32]),
                    status: BroadcastStatus::Sent,
                },
                BroadcastNotice {
                    txid: Txid([2; 32]),
                    status: BroadcastStatus::Failed,
                },
            ]
        );
    }

    #[test]
    fn broadcast_history_is_bounded() {
        let handler = NodeProgressHandler::with_broadcast_history(3);
        for byte in 0..10u8 {
            handler.tx_sent(Txid([byte; 32]));
        }

        let kept: Vec<Txid> = handler
            .snapshot()
            .broadcasts
            .iter()
            .map(|notice| notice.txid)
            .collect();
        assert_eq!(kept, vec![Txid([7; 32]), Txid([8; 32]), Txid([9; 32])]);
    }

    #[test]
    fn taking_broadcasts_drains_them() {
        let handler = NodeProgressHandler::new();
        handler.tx_failed(Txid([4; 32]));

        let taken = handler.take_broadcasts();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].status, BroadcastStatus::Failed);
        assert!(handler.snapshot().broadcasts.is_empty());
        assert!(handler.take_broadcasts().is_empty());
    }

    #[test]
    fn zero_history_keeps_nothing() {
        let handler = NodeProgressHandler::with_broadcast_history(0);
        handler.tx_sent(Txid([1; 32]));
        assert!(handler.snapshot().broadcasts.is_empty());
    }
}
