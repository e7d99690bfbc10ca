//! Auth backend interface and the provider that owns the observable session.
//!
//! `AuthProvider` is the only holder of the session: it hydrates it once from
//! the backend, replaces it after a successful `auth`, clears it on logout and
//! publishes every change so watchers can react. The access token is kept in a
//! `SecretString` and is never logged.

use crate::auth::message;
use crate::auth::types::{AuthRequest, AuthState, NonceRequest, NonceResponse, SigningMessageParams};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Issue a challenge for `request.wallet_address`.
    async fn nonce(&self, request: &NonceRequest) -> Result<NonceResponse>;

    /// Exchange a signed challenge for a session. `Ok(None)` means the backend
    /// answered without granting one.
    async fn auth(&self, request: &AuthRequest) -> Result<Option<AuthState>>;

    async fn logout(&self) -> Result<()>;

    /// Session persisted from an earlier visit, if any.
    async fn auth_state(&self) -> Result<Option<AuthState>>;

    /// Canonical message rule; must be pure and deterministic.
    fn create_signing_message(&self, params: &SigningMessageParams) -> Result<String> {
        message::create_signing_message(params)
    }
}

#[derive(Clone, Debug)]
pub struct SessionState {
    pub auth_state: Option<AuthState>,
    pub is_authenticated: bool,
    pub is_authenticating: bool,
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        // authenticating until the persisted session has been looked up
        Self {
            auth_state: None,
            is_authenticated: false,
            is_authenticating: true,
            error: None,
        }
    }
}

impl SessionState {
    /// Wallet address of the current session.
    #[must_use]
    pub fn wallet_address(&self) -> Option<&str> {
        self.auth_state.as_ref().map(AuthState::wallet_address)
    }
}

pub struct AuthProvider {
    backend: Arc<dyn AuthBackend>,
    state: watch::Sender<SessionState>,
}

impl AuthProvider {
    /// Wrap `backend` without looking up a persisted session yet.
    /// The provider reports `is_authenticating` until [`Self::hydrate`] runs.
    #[must_use]
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self { backend, state }
    }

    /// Wrap `backend` and restore the persisted session.
    pub async fn hydrated(backend: Arc<dyn AuthBackend>) -> Self {
        let provider = Self::new(backend);
        provider.hydrate().await;
        provider
    }

    /// Look up the persisted session. Failures are recorded in the state.
    #[instrument(skip(self))]
    pub async fn hydrate(&self) {
        self.state.send_modify(|state| state.is_authenticating = true);

        let restored = self.backend.auth_state().await;

        self.state.send_modify(|state| {
            match restored {
                Ok(Some(auth_state)) => {
                    debug!("restored persisted session");
                    state.auth_state = Some(auth_state);
                    state.is_authenticated = true;
                }
                Ok(None) => {
                    debug!("no persisted session");
                }
                Err(e) => {
                    error!("Error restoring session: {:#}", e);
                    state.is_authenticated = false;
                    state.error = Some(e.to_string());
                }
            }
            state.is_authenticating = false;
        });
    }

    /// # Errors
    /// Returns the backend error unchanged.
    pub async fn nonce(&self, request: &NonceRequest) -> Result<NonceResponse> {
        self.backend.nonce(request).await
    }

    /// # Errors
    /// Returns an error if the backend cannot build a message for `params`.
    pub fn create_signing_message(&self, params: &SigningMessageParams) -> Result<String> {
        self.backend.create_signing_message(params)
    }

    /// Submit a signed challenge. The session is stored when one is granted.
    ///
    /// # Errors
    /// Returns the backend error after recording it in the state.
    #[instrument(skip(self, request), fields(wallet = %request.wallet_address))]
    pub async fn auth(&self, request: &AuthRequest) -> Result<Option<AuthState>> {
        self.state.send_modify(|state| state.is_authenticating = true);

        let result = self.backend.auth(request).await;

        self.state.send_modify(|state| {
            match &result {
                Ok(Some(auth_state)) => {
                    info!("session granted");
                    state.auth_state = Some(auth_state.clone());
                    state.is_authenticated = true;
                    state.error = None;
                }
                Ok(None) => {
                    debug!("backend granted no session");
                }
                Err(e) => {
                    state.is_authenticated = false;
                    state.error = Some(e.to_string());
                }
            }
            state.is_authenticating = false;
        });

        result
    }

    /// End the backend session, then forget it locally.
    ///
    /// # Errors
    /// Returns the backend error; the local session is kept in that case.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        self.backend.logout().await?;

        self.state.send_modify(|state| {
            state.auth_state = None;
            state.is_authenticated = false;
        });

        Ok(())
    }

    #[must_use]
    pub fn auth_state(&self) -> Option<AuthState> {
        self.state.borrow().auth_state.clone()
    }

    #[must_use]
    pub fn session_address(&self) -> Option<String> {
        self.state.borrow().wallet_address().map(str::to_string)
    }

    #[must_use]
    pub fn is_authenticating(&self) -> bool {
        self.state.borrow().is_authenticating
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every session change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::{AuthUser, ChainType, SigningContext};
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Backend {
        persisted: Option<AuthState>,
        fail_restore: bool,
        grant: bool,
        logout_fails: AtomicBool,
    }

    impl Backend {
        fn new() -> Self {
            Self {
                persisted: None,
                fail_restore: false,
                grant: true,
                logout_fails: AtomicBool::new(false),
            }
        }
    }

    fn session(address: &str) -> AuthState {
        AuthState::new(
            "token",
            AuthUser {
                chain: "ethereum".to_string(),
                wallet_address: address.to_string(),
                display_address: address.to_string(),
                ..AuthUser::default()
            },
        )
    }

    fn request() -> AuthRequest {
        AuthRequest {
            wallet_address: "0xABC".to_string(),
            signature: "sig".to_string(),
            chain: "homestead".to_string(),
            context: SigningContext {
                domain: "app.example".to_string(),
                uri: "https://app.example".to_string(),
                issued_at: "2024-01-01T00:00:00.000Z".to_string(),
                chain_id: 1,
                chain_type: ChainType::Ethereum,
                locale: None,
            },
            requirements: None,
        }
    }

    #[async_trait]
    impl AuthBackend for Backend {
        async fn nonce(&self, _request: &NonceRequest) -> Result<NonceResponse> {
            Ok(NonceResponse {
                nonce: "abcdefgh".to_string(),
                statement: "Sign in".to_string(),
                format: "siwe".to_string(),
            })
        }

        async fn auth(&self, request: &AuthRequest) -> Result<Option<AuthState>> {
            if request.signature == "bad" {
                return Err(anyhow!("invalid signature"));
            }
            Ok(self.grant.then(|| session(&request.wallet_address)))
        }

        async fn logout(&self) -> Result<()> {
            if self.logout_fails.load(Ordering::SeqCst) {
                return Err(anyhow!("backend unavailable"));
            }
            Ok(())
        }

        async fn auth_state(&self) -> Result<Option<AuthState>> {
            if self.fail_restore {
                return Err(anyhow!("storage unavailable"));
            }
            Ok(self.persisted.clone())
        }
    }

    #[tokio::test]
    async fn new_provider_is_authenticating_until_hydrated() {
        let provider = AuthProvider::new(Arc::new(Backend::new()));
        assert!(provider.is_authenticating());

        provider.hydrate().await;
        assert!(!provider.is_authenticating());
        assert!(!provider.is_authenticated());
    }

    #[tokio::test]
    async fn hydrate_restores_persisted_session() {
        let mut backend = Backend::new();
        backend.persisted = Some(session("0xABC"));

        let provider = AuthProvider::hydrated(Arc::new(backend)).await;
        assert!(provider.is_authenticated());
        assert_eq!(provider.session_address().as_deref(), Some("0xABC"));
    }

    #[tokio::test]
    async fn hydrate_failure_is_recorded() {
        let mut backend = Backend::new();
        backend.fail_restore = true;

        let provider = AuthProvider::hydrated(Arc::new(backend)).await;
        assert!(!provider.is_authenticating());
        assert_eq!(provider.error().as_deref(), Some("storage unavailable"));
    }

    #[tokio::test]
    async fn auth_stores_session_and_notifies() {
        let provider = AuthProvider::hydrated(Arc::new(Backend::new())).await;
        let mut changes = provider.subscribe();
        changes.borrow_and_update();

        let granted = provider.auth(&request()).await.unwrap();
        assert!(granted.is_some());
        assert!(changes.has_changed().unwrap());
        assert_eq!(provider.session_address().as_deref(), Some("0xABC"));
        assert!(!provider.is_authenticating());
    }

    #[tokio::test]
    async fn auth_error_is_returned_and_recorded() {
        let provider = AuthProvider::hydrated(Arc::new(Backend::new())).await;
        let mut bad = request();
        bad.signature = "bad".to_string();

        let err = provider.auth(&bad).await.unwrap_err();
        assert_eq!(err.to_string(), "invalid signature");
        assert_eq!(provider.error().as_deref(), Some("invalid signature"));
        assert!(!provider.is_authenticated());
        assert!(!provider.is_authenticating());
    }

    #[tokio::test]
    async fn auth_without_grant_keeps_no_session() {
        let mut backend = Backend::new();
        backend.grant = false;
        let provider = AuthProvider::hydrated(Arc::new(backend)).await;

        assert!(provider.auth(&request()).await.unwrap().is_none());
        assert!(provider.auth_state().is_none());
    }

    #[tokio::test]
    async fn logout_clears_session_only_when_backend_agrees() {
        let backend = Arc::new(Backend::new());
        let provider = AuthProvider::hydrated(backend.clone()).await;
        provider.auth(&request()).await.unwrap();

        backend.logout_fails.store(true, Ordering::SeqCst);
        assert!(provider.logout().await.is_err());
        assert!(provider.is_authenticated());

        backend.logout_fails.store(false, Ordering::SeqCst);
        provider.logout().await.unwrap();
        assert!(provider.auth_state().is_none());
        assert!(!provider.is_authenticated());
    }

    #[tokio::test]
    async fn default_message_rule_is_canonical() {
        let provider = AuthProvider::new(Arc::new(Backend::new()));
        let params = SigningMessageParams {
            nonce: "abcdefgh".to_string(),
            wallet_address: "0xABC".to_string(),
            statement: "Sign in".to_string(),
            format: "simple".to_string(),
            context: request().context,
        };
        assert_eq!(
            provider.create_signing_message(&params).unwrap(),
            message::create_signing_message(&params).unwrap()
        );
    }
}
