//! Headless wallet login.
//!
//! `HeadlessAuth` sequences signer → nonce → message → signature → auth for
//! the connected wallet and keeps `status` in line with the session and the
//! connection, which are both owned elsewhere.
//!
//! Login and logout are serialized through one gate: a login that finds the
//! gate taken is a silent no-op, a logout waits for it. The gate is taken
//! with `try_lock` before any side effect, so two concurrent `login` calls
//! can never both reach the backend.

use crate::auth::client::AuthProvider;
use crate::auth::environment::EnvironmentContext;
use crate::auth::error::{LoginError, LogoutError};
use crate::auth::reactor::{self, Reaction, Snapshot, Watchers};
use crate::auth::status::LoginStatus;
use crate::auth::types::{
    AuthRequest, AuthRequirements, AuthState, NonceRequest, SigningMessageParams,
};
use crate::auth::wallet::{ReadyWallet, WalletProvider};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Invoked once per successful login with the new session.
pub type OnLogin = Arc<dyn Fn(&AuthState) + Send + Sync>;

const TRANSITION_BUFFER: usize = 32;

#[derive(Clone, Default)]
pub struct LoginOptions {
    pub on_login: Option<OnLogin>,
    pub auto_login: bool,
    pub auto_logout: bool,
    pub requirements: Option<AuthRequirements>,
}

impl LoginOptions {
    #[must_use]
    pub fn with_auto_login(mut self, enabled: bool) -> Self {
        self.auto_login = enabled;
        self
    }

    #[must_use]
    pub fn with_auto_logout(mut self, enabled: bool) -> Self {
        self.auto_logout = enabled;
        self
    }

    #[must_use]
    pub fn with_requirements(mut self, requirements: AuthRequirements) -> Self {
        self.requirements = Some(requirements);
        self
    }

    #[must_use]
    pub fn with_on_login<F>(mut self, on_login: F) -> Self
    where
        F: Fn(&AuthState) + Send + Sync + 'static,
    {
        self.on_login = Some(Arc::new(on_login));
        self
    }

    fn watchers(&self) -> Watchers {
        Watchers {
            auto_login: self.auto_login,
            auto_logout: self.auto_logout,
        }
    }
}

impl fmt::Debug for LoginOptions {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LoginOptions")
            .field("on_login", &self.on_login.is_some())
            .field("auto_login", &self.auto_login)
            .field("auto_logout", &self.auto_logout)
            .field("requirements", &self.requirements)
            .finish()
    }
}

/// What callers observe.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoginState {
    pub status: LoginStatus,
    pub error: Option<LoginError>,
}

pub struct HeadlessAuth {
    auth: Arc<AuthProvider>,
    wallet: Arc<dyn WalletProvider>,
    environment: Arc<dyn EnvironmentContext>,
    options: LoginOptions,
    state: watch::Sender<LoginState>,
    transitions: broadcast::Sender<LoginStatus>,
    gate: Mutex<()>,
    last_seen: Mutex<Option<Snapshot>>,
}

impl HeadlessAuth {
    #[must_use]
    pub fn new(
        auth: Arc<AuthProvider>,
        wallet: Arc<dyn WalletProvider>,
        environment: Arc<dyn EnvironmentContext>,
        options: LoginOptions,
    ) -> Self {
        let (state, _) = watch::channel(LoginState::default());
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);

        Self {
            auth,
            wallet,
            environment,
            options,
            state,
            transitions,
            gate: Mutex::new(()),
            last_seen: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn status(&self) -> LoginStatus {
        self.state.borrow().status
    }

    #[must_use]
    pub fn error(&self) -> Option<LoginError> {
        self.state.borrow().error.clone()
    }

    #[must_use]
    pub fn state(&self) -> LoginState {
        self.state.borrow().clone()
    }

    /// Receiver holding the latest [`LoginState`].
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LoginState> {
        self.state.subscribe()
    }

    /// Receiver of every status transition, in order.
    #[must_use]
    pub fn transitions(&self) -> broadcast::Receiver<LoginStatus> {
        self.transitions.subscribe()
    }

    /// Current inputs of the watchers.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            connection: self.wallet.connection(),
            session: self.auth.session_address(),
            is_authenticating: self.auth.is_authenticating(),
        }
    }

    /// Run one login attempt for the connected wallet.
    ///
    /// Does nothing when the wallet cannot sign yet, the auth client is busy,
    /// the wallet already has a session, a session for another wallet has not
    /// been cleared, or another login/logout holds the gate. Failures end in
    /// `LoginStatus::Error` with [`Self::error`] set.
    #[instrument(skip(self))]
    pub async fn login(&self) {
        let Ok(_gate) = self.gate.try_lock() else {
            debug!(
                in_flight = self.status().is_in_flight(),
                "login skipped: another operation holds the gate"
            );
            return;
        };

        let Some(wallet) = self.wallet.connection().ready() else {
            debug!("login skipped: wallet not ready");
            return;
        };

        if self.auth.is_authenticating() {
            debug!("login skipped: auth client is authenticating");
            return;
        }

        match self.auth.session_address() {
            Some(session) if session == wallet.address => {
                debug!("login skipped: wallet already authenticated");
                return;
            }
            Some(_) => {
                debug!("login skipped: session belongs to another wallet");
                return;
            }
            None => {}
        }

        match self.authenticate(&wallet).await {
            Ok(auth_state) => {
                self.set_status(LoginStatus::Success);
                info!(wallet = %wallet.address, chain = %wallet.chain.network, "login succeeded");

                if let Some(on_login) = &self.options.on_login {
                    on_login(&auth_state);
                }
            }
            Err(err) => {
                error!(reason = err.reason(), "login failed: {}", err);
                self.fail(err);
            }
        }
    }

    async fn authenticate(&self, wallet: &ReadyWallet) -> Result<AuthState, LoginError> {
        self.begin_attempt();

        let signer = self
            .wallet
            .signer(wallet.chain.id)
            .await
            .map_err(|e| LoginError::signer_unavailable(&e))?;

        let context = self.environment.signing_context(wallet.chain.id);

        let challenge = self
            .auth
            .nonce(&NonceRequest {
                wallet_address: wallet.address.clone(),
                chain: wallet.chain.network.clone(),
                locale: context.locale.clone(),
            })
            .await
            .map_err(|e| LoginError::challenge_fetch_failed(&e))?;

        let message = self
            .auth
            .create_signing_message(&SigningMessageParams {
                nonce: challenge.nonce,
                wallet_address: wallet.address.clone(),
                statement: challenge.statement,
                format: challenge.format,
                context: context.clone(),
            })
            .map_err(|e| LoginError::challenge_fetch_failed(&e))?;

        let signature = signer
            .sign_message(&message)
            .await
            .map_err(|e| LoginError::signature_rejected(&e))?;

        self.set_status(LoginStatus::Auth);

        let request = AuthRequest {
            wallet_address: wallet.address.clone(),
            signature,
            chain: wallet.chain.network.clone(),
            context,
            requirements: self.options.requirements.clone(),
        };

        match self.auth.auth(&request).await {
            Ok(Some(auth_state)) => Ok(auth_state),
            Ok(None) => Err(LoginError::no_session()),
            Err(e) => Err(LoginError::authentication_failed(&e)),
        }
    }

    /// Disconnect the wallet, then end the session, then reset status.
    ///
    /// Waits for an in-flight login to finish first. A failed disconnect
    /// stops here and keeps the session; status only returns to `None` once
    /// both steps succeeded.
    ///
    /// # Errors
    /// Returns the step that failed.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), LogoutError> {
        let _gate = self.gate.lock().await;

        self.wallet.disconnect().await.map_err(|e| {
            let err = LogoutError::Disconnect(format!("{e:#}"));
            warn!("{}", err);
            err
        })?;

        self.auth.logout().await.map_err(|e| {
            let err = LogoutError::Session(format!("{e:#}"));
            warn!("{}", err);
            err
        })?;

        self.set_status(LoginStatus::None);
        info!("logged out");

        Ok(())
    }

    /// Evaluate the watchers against the latest snapshot and apply what they
    /// ask for. Call after every change of the wallet connection or session,
    /// or let [`Self::spawn`] do it.
    #[instrument(skip(self))]
    pub async fn react(&self) -> Reaction {
        let current = self.snapshot();
        let previous = self.last_seen.lock().await.replace(current.clone());

        let reaction = reactor::react(previous.as_ref(), &current, self.options.watchers());

        if reaction.is_empty() {
            return reaction;
        }

        if reaction.reconcile {
            self.set_status(LoginStatus::Success);
        }

        if reaction.logout {
            debug!("auto-logout triggered");
            if let Err(e) = self.logout().await {
                error!("auto-logout failed: {}", e);
            }
        } else if reaction.login {
            debug!("auto-login triggered");
            self.login().await;
        }

        reaction
    }

    /// Spawn a task that runs [`Self::react`] once, then again on every change
    /// of the wallet connection or the session. Abort the handle to stop it.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        let mut wallet_changes = self.wallet.subscribe();
        let mut session_changes = self.auth.subscribe();

        tokio::spawn(async move {
            coordinator.react().await;

            loop {
                tokio::select! {
                    changed = wallet_changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    changed = session_changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }

                coordinator.react().await;
            }

            debug!("watchers stopped: change source closed");
        })
    }

    fn begin_attempt(&self) {
        self.state.send_if_modified(|state| state.error.take().is_some());
        self.set_status(LoginStatus::Signature);
    }

    fn fail(&self, err: LoginError) {
        self.state.send_modify(|state| state.error = Some(err));
        self.set_status(LoginStatus::Error);
    }

    fn set_status(&self, status: LoginStatus) {
        let changed = self.state.send_if_modified(|state| {
            if state.status == status {
                return false;
            }
            state.status = status;
            true
        });

        if changed {
            debug!(%status, "login status changed");
            // no receivers is fine
            let _ = self.transitions.send(status);
        }
    }
}
