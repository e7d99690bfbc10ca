use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of the wallet login flow as seen by the caller.
///
/// A fresh attempt always walks `Signature -> Auth -> Success`; `Error` is
/// reachable from `Signature` or `Auth`, and logout brings it back to `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoginStatus {
    #[default]
    None,
    Signature,
    Auth,
    Success,
    Error,
}

impl LoginStatus {
    /// True while a login attempt is between its first and last step.
    #[must_use]
    pub const fn is_in_flight(self) -> bool {
        matches!(self, Self::Signature | Self::Auth)
    }
}

impl fmt::Display for LoginStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "None",
            Self::Signature => "Signature",
            Self::Auth => "Auth",
            Self::Success => "Success",
            Self::Error => "Error",
        };
        formatter.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_none() {
        assert_eq!(LoginStatus::default(), LoginStatus::None);
    }

    #[test]
    fn in_flight_only_between_first_and_last_step() {
        assert!(LoginStatus::Signature.is_in_flight());
        assert!(LoginStatus::Auth.is_in_flight());
        assert!(!LoginStatus::None.is_in_flight());
        assert!(!LoginStatus::Success.is_in_flight());
        assert!(!LoginStatus::Error.is_in_flight());
    }

    #[test]
    fn serializes_as_variant_name() {
        let json = serde_json::to_string(&LoginStatus::Signature).unwrap();
        assert_eq!(json, "\"Signature\"");
        assert_eq!(LoginStatus::Success.to_string(), "Success");
    }
}
