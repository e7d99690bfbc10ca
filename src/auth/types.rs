//! Payloads exchanged with the auth backend. Field names follow the backend's
//! camelCase wire format. Access tokens and signatures travel through here, so
//! none of these values may be logged as a whole.

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Authenticated session returned by the backend.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    #[serde(deserialize_with = "secret_from_string")]
    pub access_token: SecretString,
    pub user: AuthUser,
}

impl AuthState {
    #[must_use]
    pub fn new(access_token: impl Into<String>, user: AuthUser) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            user,
        }
    }

    /// Wallet the session belongs to.
    #[must_use]
    pub fn wallet_address(&self) -> &str {
        &self.user.wallet_address
    }
}

fn secret_from_string<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub chain: String,
    pub wallet_address: String,
    pub display_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub token_balances: BTreeMap<String, String>,
}

/// Token gating rules forwarded untouched to the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_token_balance: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub token_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainType {
    #[default]
    Ethereum,
    Solana,
}

impl fmt::Display for ChainType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ethereum => formatter.write_str("Ethereum"),
            Self::Solana => formatter.write_str("Solana"),
        }
    }
}

/// Per-attempt context bound into the signed message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningContext {
    pub domain: String,
    pub uri: String,
    pub issued_at: String,
    pub chain_id: u64,
    pub chain_type: ChainType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceRequest {
    pub wallet_address: String,
    pub chain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceResponse {
    pub nonce: String,
    pub statement: String,
    pub format: String,
}

/// Everything the canonical message rule needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningMessageParams {
    pub nonce: String,
    pub wallet_address: String,
    pub statement: String,
    pub format: String,
    #[serde(flatten)]
    pub context: SigningContext,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    pub wallet_address: String,
    pub signature: String,
    pub chain: String,
    pub context: SigningContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<AuthRequirements>,
}
