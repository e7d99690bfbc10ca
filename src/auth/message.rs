//! Canonical construction of the text a wallet signs. The backend verifies the
//! signature against the same text, so field order and line layout here are a
//! wire contract; callers must sign the returned string byte for byte.

use crate::auth::types::SigningMessageParams;
use anyhow::{anyhow, Result};
use regex::Regex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SigningMessageFormat {
    /// EIP-4361 "Sign-In with Ethereum".
    Siwe,
    Simple,
}

impl From<&str> for SigningMessageFormat {
    /// Anything other than `siwe` gets the simple layout.
    fn from(format: &str) -> Self {
        if format.trim().eq_ignore_ascii_case("siwe") {
            Self::Siwe
        } else {
            Self::Simple
        }
    }
}

pub fn valid_nonce(nonce: &str) -> bool {
    // EIP-4361: at least 8 alphanumeric characters
    Regex::new(r"^[A-Za-z0-9]{8,}$").map_or(false, |re| re.is_match(nonce))
}

/// Build the message for `params` in the format the backend asked for.
///
/// # Errors
/// Returns an error for values a siwe message cannot carry.
pub fn create_signing_message(params: &SigningMessageParams) -> Result<String> {
    match SigningMessageFormat::from(params.format.as_str()) {
        SigningMessageFormat::Siwe => siwe(params),
        SigningMessageFormat::Simple => Ok(simple(params)),
    }
}

fn siwe(params: &SigningMessageParams) -> Result<String> {
    if !valid_nonce(&params.nonce) {
        return Err(anyhow!("invalid nonce for siwe message"));
    }

    if params.statement.contains('\n') {
        return Err(anyhow!("siwe statement must be a single line"));
    }

    let context = &params.context;

    let mut message = format!(
        "{} wants you to sign in with your {} account:\n{}\n\n",
        context.domain, context.chain_type, params.wallet_address
    );

    if !params.statement.is_empty() {
        message.push_str(&params.statement);
        message.push_str("\n\n");
    }

    message.push_str(&format!(
        "URI: {}\nVersion: 1\nChain ID: {}\nNonce: {}\nIssued At: {}",
        context.uri, context.chain_id, params.nonce, context.issued_at
    ));

    Ok(message)
}

fn simple(params: &SigningMessageParams) -> String {
    format!(
        "{}\n\nWallet: {}\nNonce: {}\nIssued At: {}",
        params.statement, params.wallet_address, params.nonce, params.context.issued_at
    )
}
