//! Wallet login: a headless coordinator that proves wallet ownership to an
//! auth backend with a signed challenge.
//!
//! Flow Overview: the wallet connects, the coordinator asks the connector for
//! a signer, fetches a nonce, builds the canonical message, has the wallet
//! sign it and exchanges the signature for a session. Watchers re-run on every
//! wallet or session change to log in automatically, log out when the wallet
//! goes away or switches accounts, and report `Success` for sessions restored
//! from storage. This module touches security boundaries and must never log
//! signatures or access tokens.

pub mod client;
pub mod coordinator;
pub mod environment;
pub mod error;
pub mod memory;
pub mod message;
pub mod reactor;
pub mod status;
pub mod types;
pub mod wallet;

pub use client::{AuthBackend, AuthProvider, SessionState};
pub use coordinator::{HeadlessAuth, LoginOptions, LoginState, OnLogin};
pub use environment::{EnvironmentContext, StaticEnvironment};
pub use error::{LoginError, LogoutError};
pub use status::LoginStatus;
pub use types::{
    AuthRequest, AuthRequirements, AuthState, AuthUser, ChainType, NonceRequest, NonceResponse,
    SigningContext, SigningMessageParams,
};
pub use wallet::{Chain, Connection, ConnectionStatus, Signer, WalletProvider};
