//! Session credentials: call-scoped overrides layered over injected defaults.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::TRACING_TARGET_CONFIG;
use crate::error::{Error, Result};

/// Environment variable holding a pre-authenticated token.
pub const ENV_TOKEN: &str = "NVISY_STREAM_TOKEN";
/// Environment variable holding the storage or identity endpoint.
pub const ENV_ENDPOINT: &str = "NVISY_STREAM_ENDPOINT";
/// Environment variable holding the account (user) name.
pub const ENV_ACCOUNT: &str = "NVISY_STREAM_ACCOUNT";
/// Environment variable holding the account API key.
pub const ENV_KEY: &str = "NVISY_STREAM_KEY";

/// Recognised connection options.
///
/// Any field may be absent. A usable configuration carries either
/// `token` + `endpoint` or `account` + `key` + `endpoint`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct StreamConfig {
    /// Pre-authenticated session token
    #[cfg_attr(feature = "config", arg(long = "token", env = "NVISY_STREAM_TOKEN"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Storage endpoint (token auth) or identity endpoint (account auth)
    #[cfg_attr(feature = "config", arg(long = "endpoint", env = "NVISY_STREAM_ENDPOINT"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Account (user) name
    #[cfg_attr(feature = "config", arg(long = "account", env = "NVISY_STREAM_ACCOUNT"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,

    /// Account API key
    #[cfg_attr(feature = "config", arg(long = "key", env = "NVISY_STREAM_KEY"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl StreamConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pre-authenticated token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the account credentials.
    #[must_use]
    pub fn with_account(mut self, account: impl Into<String>, key: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self.key = Some(key.into());
        self
    }

    /// Fills every unset field from `defaults`.
    #[must_use]
    pub fn or(self, defaults: StreamConfig) -> Self {
        Self {
            token: self.token.or(defaults.token),
            endpoint: self.endpoint.or(defaults.endpoint),
            account: self.account.or(defaults.account),
            key: self.key.or(defaults.key),
        }
    }

    /// Whether no option is set.
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.endpoint.is_none() && self.account.is_none() && self.key.is_none()
    }
}

impl fmt::Debug for StreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("account", &self.account)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Source of process-wide default options.
pub trait ConfigProvider: Send + Sync {
    /// Returns the defaults to merge under call-scoped options.
    fn defaults(&self) -> StreamConfig;
}

/// A fixed set of defaults.
#[derive(Debug, Clone, Default)]
pub struct StaticConfig(pub StreamConfig);

impl ConfigProvider for StaticConfig {
    fn defaults(&self) -> StreamConfig {
        self.0.clone()
    }
}

/// Defaults read from `NVISY_STREAM_*` environment variables on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl ConfigProvider for EnvConfig {
    fn defaults(&self) -> StreamConfig {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        StreamConfig {
            token: var(ENV_TOKEN),
            endpoint: var(ENV_ENDPOINT),
            account: var(ENV_ACCOUNT),
            key: var(ENV_KEY),
        }
    }
}

/// Credentials sufficient to open a session.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Pre-authenticated token against a storage endpoint.
    Token { token: String, endpoint: Url },
    /// Account name and key against an identity endpoint.
    Account {
        account: String,
        key: String,
        endpoint: Url,
    },
}

impl Credentials {
    /// Returns the endpoint the credentials are bound to.
    pub fn endpoint(&self) -> &Url {
        match self {
            Self::Token { endpoint, .. } | Self::Account { endpoint, .. } => endpoint,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token { endpoint, .. } => f
                .debug_struct("Token")
                .field("endpoint", &endpoint.as_str())
                .finish_non_exhaustive(),
            Self::Account {
                account, endpoint, ..
            } => f
                .debug_struct("Account")
                .field("account", account)
                .field("endpoint", &endpoint.as_str())
                .finish_non_exhaustive(),
        }
    }
}

/// Resolves [`Credentials`] from call-scoped options and injected defaults.
#[derive(Clone)]
pub struct ConfigResolver {
    defaults: Arc<dyn ConfigProvider>,
}

impl ConfigResolver {
    /// Creates a resolver over the given default provider.
    pub fn new(defaults: impl ConfigProvider + 'static) -> Self {
        Self {
            defaults: Arc::new(defaults),
        }
    }

    /// Creates a resolver with no defaults: every call must be self-sufficient.
    pub fn without_defaults() -> Self {
        Self::new(StaticConfig::default())
    }

    /// Merges `overrides` over the defaults and picks a credential combination.
    ///
    /// Token credentials win over account credentials when both are complete.
    pub fn resolve(&self, overrides: &StreamConfig) -> Result<Credentials> {
        let merged = overrides.clone().or(self.defaults.defaults());

        let Some(endpoint) = merged.endpoint.as_deref() else {
            return Err(Error::authentication("no endpoint configured"));
        };
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::authentication(format!("invalid endpoint '{endpoint}': {e}")))?;

        let credentials = match merged {
            StreamConfig {
                token: Some(token), ..
            } => Credentials::Token { token, endpoint },
            StreamConfig {
                account: Some(account),
                key: Some(key),
                ..
            } => Credentials::Account {
                account,
                key,
                endpoint,
            },
            _ => {
                return Err(Error::authentication(
                    "either 'token' or 'account' and 'key' must be configured",
                ));
            }
        };

        tracing::trace!(
            target: TRACING_TARGET_CONFIG,
            credentials = ?credentials,
            "Resolved session credentials"
        );

        Ok(credentials)
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new(EnvConfig)
    }
}

impl fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigResolver").finish_non_exhaustive()
    }
}
