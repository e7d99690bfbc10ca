//! Replay a scripted wallet session through the coordinator.
//!
//! The script is a JSON document with a list of events. Each event is applied
//! to the in-memory wallet or backend (or calls `login`/`logout`), then one
//! reactive tick runs, and a JSON line with the resulting status is printed.

use crate::auth::memory::{MemoryBackend, MemoryWallet};
use crate::auth::{
    AuthProvider, Chain, HeadlessAuth, LoginOptions, LoginStatus, StaticEnvironment,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Args {
    pub script: PathBuf,
    pub origin: String,
    pub locale: Option<String>,
    pub auto_login: bool,
    pub auto_logout: bool,
}

#[derive(Debug, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub statement: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    pub events: Vec<Event>,
}

fn default_chain_id() -> u64 {
    1
}

fn default_network() -> String {
    "homestead".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum Event {
    #[serde(rename_all = "camelCase")]
    Connect {
        address: String,
        #[serde(default = "default_chain_id")]
        chain_id: u64,
        #[serde(default = "default_network")]
        network: String,
    },
    Disconnect,
    SwitchAccount {
        address: String,
    },
    #[serde(rename_all = "camelCase")]
    SwitchChain {
        chain_id: u64,
        network: String,
    },
    Reconnecting,
    Reconnected,
    RejectSignatures {
        reject: bool,
    },
    RefuseSigner {
        refuse: bool,
    },
    RestoreSession {
        address: String,
        #[serde(default = "default_network")]
        chain: String,
    },
    Login,
    Logout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub step: usize,
    #[serde(flatten)]
    pub event: Event,
    pub status: LoginStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

/// Handle the replay action
/// # Errors
/// Returns an error if the script cannot be read or parsed, or the origin is invalid.
pub async fn execute(args: Args) -> Result<()> {
    let raw = tokio::fs::read_to_string(&args.script)
        .await
        .with_context(|| format!("failed to read script {}", args.script.display()))?;

    let script: Script = serde_json::from_str(&raw).context("invalid replay script")?;

    for step in replay(&args, &script).await? {
        println!("{}", serde_json::to_string(&step)?);
    }

    Ok(())
}

/// Apply every event of `script` and collect the state after each one.
/// # Errors
/// Returns an error if the origin in `args` is invalid.
pub async fn replay(args: &Args, script: &Script) -> Result<Vec<Step>> {
    let backend = Arc::new(MemoryBackend::with_challenge(
        script
            .statement
            .as_deref()
            .unwrap_or("Sign in with your wallet"),
        script.format.as_deref().unwrap_or("siwe"),
    ));
    let wallet = Arc::new(MemoryWallet::new());
    let auth = Arc::new(AuthProvider::hydrated(backend.clone()).await);
    let environment = Arc::new(
        StaticEnvironment::new(&args.origin, args.locale.clone())
            .with_context(|| format!("invalid origin {}", args.origin))?,
    );

    let options = LoginOptions::default()
        .with_auto_login(args.auto_login)
        .with_auto_logout(args.auto_logout)
        .with_on_login(|session| info!(wallet = %session.user.display_address, "on_login"));

    let coordinator = HeadlessAuth::new(auth.clone(), wallet.clone(), environment, options);

    // mount
    coordinator.react().await;

    let mut steps = Vec::with_capacity(script.events.len());

    for (index, event) in script.events.iter().enumerate() {
        match event {
            Event::Connect {
                address,
                chain_id,
                network,
            } => wallet.connect(address, Chain::new(*chain_id, network.as_str())),
            Event::Disconnect => wallet.drop_connection(),
            Event::SwitchAccount { address } => wallet.switch_account(address),
            Event::SwitchChain { chain_id, network } => {
                wallet.switch_chain(Chain::new(*chain_id, network.as_str()));
            }
            Event::Reconnecting => wallet.begin_reconnect(),
            Event::Reconnected => wallet.finish_reconnect(),
            Event::RejectSignatures { reject } => wallet.reject_signatures(*reject),
            Event::RefuseSigner { refuse } => wallet.refuse_signer(*refuse),
            Event::RestoreSession { address, chain } => {
                backend
                    .persist(MemoryBackend::session_for(address, chain))
                    .await;
                auth.hydrate().await;
            }
            Event::Login => coordinator.login().await,
            Event::Logout => {
                if let Err(e) = coordinator.logout().await {
                    warn!("logout failed: {}", e);
                }
            }
        }

        coordinator.react().await;

        let state = coordinator.state();
        steps.push(Step {
            step: index + 1,
            event: event.clone(),
            status: state.status,
            error: state.error.map(|e| e.to_string()),
            session: auth.session_address(),
        });
    }

    Ok(steps)
}
