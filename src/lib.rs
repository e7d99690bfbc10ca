//! # walletauth
//!
//! Headless "sign in with your wallet" coordination. The crate sits between a
//! wallet connector and an auth backend: it watches the wallet connection,
//! runs the nonce → message → signature → session exchange when appropriate,
//! and reports a single [`auth::LoginStatus`] to the host application.
//!
//! The wallet connector and the auth backend are collaborators behind the
//! [`auth::WalletProvider`] and [`auth::AuthBackend`] traits. In-memory
//! versions of both live in [`auth::memory`]; the `walletauth` binary uses
//! them to replay scripted wallet sessions.

pub mod auth;
pub mod cli;
