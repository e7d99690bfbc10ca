//! In-memory wallet and backend. They let the replay CLI and the tests drive
//! the coordinator end to end without a browser wallet or a network.
//!
//! Signatures produced here are a base64 envelope of address and message, not
//! cryptography: `MemoryBackend` only checks that the envelope names the right
//! wallet and embeds the nonce it issued.

use crate::auth::client::AuthBackend;
use crate::auth::types::{AuthRequest, AuthState, AuthUser, NonceRequest, NonceResponse};
use crate::auth::wallet::{Chain, Connection, ConnectionStatus, Signer, WalletProvider};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::debug;
use ulid::Ulid;

const CONNECTOR_ID: &str = "memory";

pub struct MemoryWallet {
    state: watch::Sender<Connection>,
    reject_signatures: Arc<AtomicBool>,
    refuse_signer: AtomicBool,
}

impl Default for MemoryWallet {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryWallet {
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(Connection::default());
        Self {
            state,
            reject_signatures: Arc::new(AtomicBool::new(false)),
            refuse_signer: AtomicBool::new(false),
        }
    }

    pub fn connect(&self, address: &str, chain: Chain) {
        self.state.send_replace(Connection {
            status: ConnectionStatus::Connected,
            address: Some(address.to_string()),
            chain: Some(chain),
            connector: Some(CONNECTOR_ID.to_string()),
        });
    }

    pub fn switch_account(&self, address: &str) {
        self.state
            .send_modify(|connection| connection.address = Some(address.to_string()));
    }

    pub fn switch_chain(&self, chain: Chain) {
        self.state.send_modify(|connection| connection.chain = Some(chain));
    }

    /// The user disconnected from the wallet side.
    pub fn drop_connection(&self) {
        self.state.send_replace(Connection::default());
    }

    /// Enter the transient state wallets go through after a page reload.
    pub fn begin_reconnect(&self) {
        self.state
            .send_modify(|connection| connection.status = ConnectionStatus::Reconnecting);
    }

    pub fn finish_reconnect(&self) {
        self.state.send_modify(|connection| {
            connection.status = if connection.address.is_some() {
                ConnectionStatus::Connected
            } else {
                ConnectionStatus::Disconnected
            };
        });
    }

    /// Make the user decline every signature request.
    pub fn reject_signatures(&self, reject: bool) {
        self.reject_signatures.store(reject, Ordering::SeqCst);
    }

    /// Make the connector refuse to hand out signers.
    pub fn refuse_signer(&self, refuse: bool) {
        self.refuse_signer.store(refuse, Ordering::SeqCst);
    }
}

#[async_trait]
impl WalletProvider for MemoryWallet {
    fn connection(&self) -> Connection {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Connection> {
        self.state.subscribe()
    }

    async fn signer(&self, chain_id: u64) -> Result<Box<dyn Signer>> {
        if self.refuse_signer.load(Ordering::SeqCst) {
            return Err(anyhow!("connector refused signer request"));
        }

        let connection = self.connection();

        let address = match (&connection.status, connection.address) {
            (ConnectionStatus::Connected, Some(address)) => address,
            _ => return Err(anyhow!("wallet not connected")),
        };

        if connection.chain.map(|chain| chain.id) != Some(chain_id) {
            return Err(anyhow!("wallet is not on chain {chain_id}"));
        }

        Ok(Box::new(MemorySigner {
            address,
            reject: Arc::clone(&self.reject_signatures),
        }))
    }

    async fn disconnect(&self) -> Result<()> {
        self.drop_connection();
        Ok(())
    }
}

pub struct MemorySigner {
    address: String,
    reject: Arc<AtomicBool>,
}

impl MemorySigner {
    /// Envelope a signer for `address` returns for `message`.
    #[must_use]
    pub fn envelope(address: &str, message: &str) -> String {
        Base64::encode_string(format!("{address}\n{message}").as_bytes())
    }

    /// Split an envelope back into address and message.
    ///
    /// # Errors
    /// Returns an error if `signature` is not an envelope.
    pub fn open(signature: &str) -> Result<(String, String)> {
        let bytes =
            Base64::decode_vec(signature).map_err(|e| anyhow!("malformed signature: {}", e))?;

        let text = String::from_utf8(bytes).map_err(|_| anyhow!("malformed signature"))?;

        text.split_once('\n')
            .map(|(address, message)| (address.to_string(), message.to_string()))
            .ok_or_else(|| anyhow!("malformed signature"))
    }
}

#[async_trait]
impl Signer for MemorySigner {
    async fn sign_message(&self, message: &str) -> Result<String> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(anyhow!("user rejected signature request"));
        }
        Ok(Self::envelope(&self.address, message))
    }
}

pub struct MemoryBackend {
    statement: String,
    format: String,
    nonces: Mutex<HashMap<String, String>>,
    persisted: Mutex<Option<AuthState>>,
    last_request: Mutex<Option<AuthRequest>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::with_challenge("Sign in with your wallet", "siwe")
    }

    #[must_use]
    pub fn with_challenge(statement: &str, format: &str) -> Self {
        Self {
            statement: statement.to_string(),
            format: format.to_string(),
            nonces: Mutex::new(HashMap::new()),
            persisted: Mutex::new(None),
            last_request: Mutex::new(None),
        }
    }

    /// Store a session as if it had been granted on an earlier visit.
    pub async fn persist(&self, auth_state: AuthState) {
        *self.persisted.lock().await = Some(auth_state);
    }

    pub async fn persisted(&self) -> Option<AuthState> {
        self.persisted.lock().await.clone()
    }

    pub async fn last_request(&self) -> Option<AuthRequest> {
        self.last_request.lock().await.clone()
    }

    /// Session this backend grants to `address`.
    #[must_use]
    pub fn session_for(address: &str, chain: &str) -> AuthState {
        AuthState::new(
            Ulid::new().to_string(),
            AuthUser {
                chain: chain.to_string(),
                wallet_address: address.to_string(),
                display_address: display_address(address),
                ..AuthUser::default()
            },
        )
    }
}

fn display_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

#[async_trait]
impl AuthBackend for MemoryBackend {
    async fn nonce(&self, request: &NonceRequest) -> Result<NonceResponse> {
        let nonce = Ulid::new().to_string();

        self.nonces
            .lock()
            .await
            .insert(request.wallet_address.to_lowercase(), nonce.clone());

        debug!(wallet = %request.wallet_address, chain = %request.chain, "nonce issued");

        Ok(NonceResponse {
            nonce,
            statement: self.statement.clone(),
            format: self.format.clone(),
        })
    }

    async fn auth(&self, request: &AuthRequest) -> Result<Option<AuthState>> {
        *self.last_request.lock().await = Some(request.clone());

        let (address, message) = MemorySigner::open(&request.signature)?;
        if address != request.wallet_address {
            return Err(anyhow!("signature was not made by {}", request.wallet_address));
        }

        // nonces are single use
        let Some(nonce) = self
            .nonces
            .lock()
            .await
            .remove(&request.wallet_address.to_lowercase())
        else {
            return Err(anyhow!("no pending nonce for {}", request.wallet_address));
        };

        if !message.contains(&nonce) {
            return Err(anyhow!("signature does not match the issued nonce"));
        }

        let session = Self::session_for(&request.wallet_address, &request.chain);
        *self.persisted.lock().await = Some(session.clone());

        Ok(Some(session))
    }

    async fn logout(&self) -> Result<()> {
        self.persisted.lock().await.take();
        Ok(())
    }

    async fn auth_state(&self) -> Result<Option<AuthState>> {
        Ok(self.persisted.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::{ChainType, SigningContext};

    fn context() -> SigningContext {
        SigningContext {
            domain: "app.example".to_string(),
            uri: "https://app.example".to_string(),
            issued_at: "2024-01-01T00:00:00.000Z".to_string(),
            chain_id: 1,
            chain_type: ChainType::Ethereum,
            locale: None,
        }
    }

    async fn signed_request(backend: &MemoryBackend, address: &str) -> AuthRequest {
        let challenge = backend
            .nonce(&NonceRequest {
                wallet_address: address.to_string(),
                chain: "homestead".to_string(),
                locale: None,
            })
            .await
            .unwrap();

        AuthRequest {
            wallet_address: address.to_string(),
            signature: MemorySigner::envelope(address, &format!("Nonce: {}", challenge.nonce)),
            chain: "homestead".to_string(),
            context: context(),
            requirements: None,
        }
    }

    #[test]
    fn envelope_round_trips() {
        let signature = MemorySigner::envelope("0xABC", "line one\nline two");
        let (address, message) = MemorySigner::open(&signature).unwrap();
        assert_eq!(address, "0xABC");
        assert_eq!(message, "line one\nline two");
        assert!(MemorySigner::open("not base64!").is_err());
    }

    #[test]
    fn display_address_shortens_long_addresses() {
        assert_eq!(
            display_address("0x71C7656EC7ab88b098defB751B7401B5f6d8976F"),
            "0x71C7...976F"
        );
        assert_eq!(display_address("0xABC"), "0xABC");
    }

    #[tokio::test]
    async fn wallet_tracks_connection_changes() {
        let wallet = MemoryWallet::new();
        let mut changes = wallet.subscribe();

        wallet.connect("0xABC", Chain::new(1, "homestead"));
        assert!(changes.has_changed().unwrap());
        assert!(wallet.connection().is_connected());

        wallet.begin_reconnect();
        assert!(wallet.connection().is_reconnecting());
        wallet.finish_reconnect();
        assert!(wallet.connection().is_connected());

        wallet.disconnect().await.unwrap();
        assert!(wallet.connection().is_disconnected());
        assert!(wallet.connection().address.is_none());
    }

    #[tokio::test]
    async fn signer_requires_connected_wallet_on_same_chain() {
        let wallet = MemoryWallet::new();
        assert!(wallet.signer(1).await.is_err());

        wallet.connect("0xABC", Chain::new(1, "homestead"));
        assert!(wallet.signer(137).await.is_err());

        let signer = wallet.signer(1).await.unwrap();
        let signature = signer.sign_message("hello").await.unwrap();
        assert_eq!(signature, MemorySigner::envelope("0xABC", "hello"));

        wallet.reject_signatures(true);
        assert!(signer.sign_message("hello").await.is_err());

        wallet.refuse_signer(true);
        assert!(wallet.signer(1).await.is_err());
    }

    #[tokio::test]
    async fn backend_grants_and_persists_session() {
        let backend = MemoryBackend::new();
        let request = signed_request(&backend, "0xABC").await;

        let session = backend.auth(&request).await.unwrap().unwrap();
        assert_eq!(session.wallet_address(), "0xABC");
        assert_eq!(
            backend.auth_state().await.unwrap().map(|s| s.user.wallet_address),
            Some("0xABC".to_string())
        );

        backend.logout().await.unwrap();
        assert!(backend.auth_state().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn backend_nonce_is_single_use() {
        let backend = MemoryBackend::new();
        let request = signed_request(&backend, "0xABC").await;

        assert!(backend.auth(&request).await.is_ok());
        let err = backend.auth(&request).await.unwrap_err();
        assert!(err.to_string().contains("no pending nonce"));
    }

    #[tokio::test]
    async fn backend_rejects_foreign_signature() {
        let backend = MemoryBackend::new();
        let mut request = signed_request(&backend, "0xABC").await;
        request.signature = MemorySigner::envelope("0xDEF", "Nonce: whatever");

        assert!(backend.auth(&request).await.is_err());
    }

    #[tokio::test]
    async fn backend_rejects_stale_nonce() {
        let backend = MemoryBackend::new();
        let mut request = signed_request(&backend, "0xABC").await;
        request.signature = MemorySigner::envelope("0xABC", "Nonce: 01OLDNONCE");

        let err = backend.auth(&request).await.unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }
}
