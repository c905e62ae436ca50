//! Value types exchanged with the wallet engine.
//!
//! The orchestrator reads these but never interprets them beyond what the UI needs: totals, ids and
//! ordering. Balance computation and descriptor handling stay inside the engine.

use serde::{Deserialize, Serialize};

/// Bitcoin network the wallet is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Bitcoin,
    Testnet,
    Signet,
    Regtest,
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Network::Bitcoin => "bitcoin",
            Network::Testnet => "testnet",
            Network::Signet => "signet",
            Network::Regtest => "regtest",
        };
        f.write_str(name)
    }
}

/// Wallet balance split by confirmation status, in satoshis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub immature: u64,
    pub trusted_pending: u64,
    pub untrusted_pending: u64,
    pub confirmed: u64,
}

impl Balance {
    /// Sum of every bucket.
    pub fn total(&self) -> u64 {
        self.immature
            .saturating_add(self.trusted_pending)
            .saturating_add(self.untrusted_pending)
            .saturating_add(self.confirmed)
    }
}

/// Transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Txid(pub [u8; 32]);

impl std::fmt::Display for Txid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Where a transaction sits relative to the best chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainPosition {
    Confirmed { height: u32, timestamp: u64 },
    Unconfirmed { last_seen: Option<u64> },
}

/// A wallet transaction in canonical (conflict-free) order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalTx {
    pub txid: Txid,
    pub chain_position: ChainPosition,
    /// Satoshis sent from the wallet
    pub sent: u64,
    /// Satoshis received by the wallet
    pub received: u64,
}

/// A script pubkey handed to inspectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script(pub Vec<u8>);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeychainKind {
    External,
    Internal,
}

/// Recovery material exported by the engine. Opaque to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupInfo {
    pub mnemonic: String,
    pub descriptor: String,
    pub change_descriptor: String,
}

/// Phases reported by a peer-connected sync node, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeState {
    Behind,
    HeadersSynced,
    FilterHeadersSynced,
    FiltersSynced,
    TransactionsSynced,
}

impl NodeState {
    /// Coarse percentage for this phase on a 0-100 scale.
    pub const fn progress(self) -> u8 {
        match self {
            NodeState::Behind => 20,
            NodeState::HeadersSynced => 40,
            NodeState::FilterHeadersSynced => 60,
            NodeState::FiltersSynced => 80,
            NodeState::TransactionsSynced => 100,
        }
    }
}

/// Non-fatal conditions reported by the sync node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    NotEnoughConnections,
    PeerTimedOut,
    UnsolicitedMessage,
    CouldNotConnect,
    CorruptedHeaders,
    TransactionRejected,
    FailedPersistence(String),
    EvaluatingFork,
    EmptyPeerDatabase,
    UnexpectedSyncError(String),
    NoCompactFilters,
    PotentialStaleTip,
    UnlinkableAnchor,
    ChannelDropped,
}

impl Warning {
    /// Human readable description used when logging the warning.
    pub fn description(&self) -> &str {
        match self {
            Warning::NotEnoughConnections => "Searching for connections",
            Warning::PeerTimedOut => "A peer timed out",
            Warning::UnsolicitedMessage => "A peer sent an unsolicited message",
            Warning::CouldNotConnect => "The node reached out to a peer and could not connect",
            Warning::CorruptedHeaders => "The loaded headers do not link together",
            Warning::TransactionRejected => "A transaction was rejected",
            Warning::FailedPersistence(message) => message.as_str(),
            Warning::EvaluatingFork => "Evaluating a potential fork",
            Warning::EmptyPeerDatabase => "The peer database is empty",
            Warning::UnexpectedSyncError(message) => message.as_str(),
            Warning::NoCompactFilters => "A connected peer does not serve compact block filters",
            Warning::PotentialStaleTip => "The node has not seen a new block for a long duration",
            Warning::UnlinkableAnchor => {
                "The configured recovery does not link to block headers stored in the database"
            }
            Warning::ChannelDropped => {
                "A channel that was supposed to receive a message was dropped"
            }
        }
    }
}
