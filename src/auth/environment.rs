//! Host environment capability: where the app is served from, the user's
//! locale and the wall clock. Kept behind a trait so the coordinator does not
//! depend on a browser.

use crate::auth::types::{ChainType, SigningContext};
use anyhow::{anyhow, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use url::Url;

pub trait EnvironmentContext: Send + Sync {
    /// Host (and port, when not the default) the app is served from.
    fn domain(&self) -> String;

    /// Serialized origin, e.g. `https://app.example`.
    fn uri(&self) -> String;

    fn locale(&self) -> Option<String>;

    fn now(&self) -> DateTime<Utc>;

    /// Fresh context for one login attempt.
    fn signing_context(&self, chain_id: u64) -> SigningContext {
        SigningContext {
            domain: self.domain(),
            uri: self.uri(),
            issued_at: self.now().to_rfc3339_opts(SecondsFormat::Millis, true),
            chain_id,
            chain_type: ChainType::Ethereum,
            locale: self.locale(),
        }
    }
}

/// Environment pinned to one origin, reading the system clock.
#[derive(Clone, Debug)]
pub struct StaticEnvironment {
    domain: String,
    uri: String,
    locale: Option<String>,
}

impl StaticEnvironment {
    /// # Errors
    /// Returns an error if `origin` is not an absolute URL with a host.
    pub fn new(origin: &str, locale: Option<String>) -> Result<Self> {
        let url = Url::parse(origin)?;

        let host = url
            .host_str()
            .ok_or_else(|| anyhow!("Error parsing origin: no host specified"))?;

        // Url::port() is None for the scheme's default port
        let domain = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Ok(Self {
            domain,
            uri: url.origin().ascii_serialization(),
            locale: locale.filter(|l| !l.trim().is_empty()),
        })
    }
}

impl EnvironmentContext for StaticEnvironment {
    fn domain(&self) -> String {
        self.domain.clone()
    }

    fn uri(&self) -> String {
        self.uri.clone()
    }

    fn locale(&self) -> Option<String> {
        self.locale.clone()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
