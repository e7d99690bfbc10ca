//! Wallet-side collaborator. The connection is owned by the wallet library;
//! the coordinator only reads snapshots of it, asks for a signer per attempt
//! and may request a disconnect.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Connecting,
    Reconnecting,
    #[default]
    Disconnected,
}

/// Active network of the connected wallet.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chain {
    pub id: u64,
    /// Network slug the backend keys nonces and sessions on, e.g. `homestead`.
    pub network: String,
}

impl Chain {
    #[must_use]
    pub fn new(id: u64, network: impl Into<String>) -> Self {
        Self {
            id,
            network: network.into(),
        }
    }
}

/// Snapshot of the wallet connection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub status: ConnectionStatus,
    pub address: Option<String>,
    pub chain: Option<Chain>,
    /// Identifier of the connector able to hand out signers.
    pub connector: Option<String>,
}

/// Parts of a connection a login attempt needs, all present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadyWallet {
    pub address: String,
    pub chain: Chain,
}

impl Connection {
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        self.status == ConnectionStatus::Disconnected
    }

    #[must_use]
    pub fn is_reconnecting(&self) -> bool {
        self.status == ConnectionStatus::Reconnecting
    }

    /// Returns the address and chain when the wallet can sign right now.
    #[must_use]
    pub fn ready(&self) -> Option<ReadyWallet> {
        if !self.is_connected() || self.connector.is_none() {
            return None;
        }

        Some(ReadyWallet {
            address: self.address.clone()?,
            chain: self.chain.clone()?,
        })
    }
}

#[async_trait]
pub trait Signer: Send + Sync {
    /// Sign `message` exactly as given.
    async fn sign_message(&self, message: &str) -> Result<String>;
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Current connection snapshot.
    fn connection(&self) -> Connection;

    /// Receiver notified on every connection change.
    fn subscribe(&self) -> watch::Receiver<Connection>;

    /// Ask the connector for a signer bound to `chain_id`.
    async fn signer(&self, chain_id: u64) -> Result<Box<dyn Signer>>;

    async fn disconnect(&self) -> Result<()>;
}
