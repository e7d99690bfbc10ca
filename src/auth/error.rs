use thiserror::Error;

/// Failure of a single login attempt.
///
/// The display text is what a UI shows to the user; `reason` keeps the
/// collaborator's own message for logs.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LoginError {
    #[error("Failed to get signer. Is your wallet connected?")]
    SignerUnavailable { reason: String },
    #[error("Failed to generate nonce. Please try again.")]
    ChallengeFetchFailed { reason: String },
    #[error("Failed to get signature")]
    SignatureRejected { reason: String },
    #[error("{message}")]
    AuthenticationFailed { message: String },
}

impl LoginError {
    pub(crate) fn signer_unavailable(err: &anyhow::Error) -> Self {
        Self::SignerUnavailable {
            reason: format!("{err:#}"),
        }
    }

    pub(crate) fn challenge_fetch_failed(err: &anyhow::Error) -> Self {
        Self::ChallengeFetchFailed {
            reason: format!("{err:#}"),
        }
    }

    pub(crate) fn signature_rejected(err: &anyhow::Error) -> Self {
        Self::SignatureRejected {
            reason: format!("{err:#}"),
        }
    }

    pub(crate) fn authentication_failed(err: &anyhow::Error) -> Self {
        Self::AuthenticationFailed {
            message: err.to_string(),
        }
    }

    /// The backend answered without a session.
    pub(crate) fn no_session() -> Self {
        Self::AuthenticationFailed {
            message: "Failed to authenticate".to_string(),
        }
    }

    /// Underlying collaborator message, when there is one.
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::SignerUnavailable { reason }
            | Self::ChallengeFetchFailed { reason }
            | Self::SignatureRejected { reason } => reason,
            Self::AuthenticationFailed { message } => message,
        }
    }
}

/// Failure while ending a session.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LogoutError {
    #[error("failed to disconnect wallet: {0}")]
    Disconnect(String),
    #[error("failed to end session: {0}")]
    Session(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn signer_message_mentions_wallet_connection() {
        let err = LoginError::signer_unavailable(&anyhow!("user rejected"));
        assert!(err.to_string().contains("signer"));
        assert!(err.to_string().contains("wallet connected"));
        assert_eq!(err.reason(), "user rejected");
    }

    #[test]
    fn authentication_failure_surfaces_backend_message() {
        let err = LoginError::authentication_failed(&anyhow!("token gate not satisfied"));
        assert_eq!(err.to_string(), "token gate not satisfied");
        assert_eq!(LoginError::no_session().to_string(), "Failed to authenticate");
    }

    #[test]
    fn context_chain_is_kept_in_reason() {
        let err = anyhow!("connection reset").context("nonce request failed");
        let err = LoginError::challenge_fetch_failed(&err);
        assert_eq!(err.reason(), "nonce request failed: connection reset");
        assert_eq!(err.to_string(), "Failed to generate nonce. Please try again.");
    }
}
