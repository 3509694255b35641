//! Session factory: authentication against a Swift endpoint.

use std::sync::Arc;

use nvisy_stream::StoreResult;
use nvisy_stream::store::{Session, SessionFactory};
use reqwest::{Client, Method};
use url::Url;

use crate::TRACING_TARGET_CLIENT;
use crate::config::SwiftConfig;
use crate::error::{Error, Result};
use crate::metadata::{AUTH_KEY, AUTH_TOKEN, AUTH_USER, STORAGE_URL, header};
use crate::session::SwiftSession;

/// Inner factory state shared by clones.
struct SwiftSessionFactoryInner {
    http: Client,
    config: SwiftConfig,
}

/// Creates [`SwiftSession`]s from tokens or account credentials.
///
/// # Examples
///
/// ```rust,ignore
/// use nvisy_stream::{StreamContext, config::ConfigResolver};
/// use nvisy_swift::{SwiftConfig, SwiftSessionFactory};
///
/// let factory = SwiftSessionFactory::new(SwiftConfig::default())?;
/// let context = StreamContext::new(factory, ConfigResolver::default());
/// ```
#[derive(Clone)]
pub struct SwiftSessionFactory {
    inner: Arc<SwiftSessionFactoryInner>,
}

impl std::fmt::Debug for SwiftSessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwiftSessionFactory")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl SwiftSessionFactory {
    /// Creates a factory with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: SwiftConfig) -> Result<Self> {
        let timeout = config.effective_timeout();

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            timeout_ms = timeout.as_millis(),
            "Creating Swift session factory"
        );

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(config.effective_user_agent())
            .build()?;

        let inner = SwiftSessionFactoryInner { http, config };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Creates a factory with the default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(SwiftConfig::default())
    }

    /// Returns the factory configuration.
    pub fn config(&self) -> &SwiftConfig {
        &self.inner.config
    }

    /// Exchanges account credentials for a token and a storage URL.
    async fn authenticate(&self, account: &str, key: &str, endpoint: &Url) -> Result<SwiftSession> {
        let response = self
            .inner
            .http
            .get(endpoint.clone())
            .header(AUTH_USER, account)
            .header(AUTH_KEY, key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                method: Method::GET,
                url: endpoint.to_string(),
                status,
            });
        }

        let headers = response.headers();
        let token = header(headers, AUTH_TOKEN).ok_or(Error::Header(AUTH_TOKEN))?;
        let storage_url = header(headers, STORAGE_URL).ok_or(Error::Header(STORAGE_URL))?;
        let storage_url = Url::parse(storage_url)?;

        Ok(SwiftSession::new(self.inner.http.clone(), storage_url, token))
    }
}

#[async_trait::async_trait]
impl SessionFactory for SwiftSessionFactory {
    async fn from_token(&self, token: &str, endpoint: &Url) -> StoreResult<Arc<dyn Session>> {
        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            storage_url = %endpoint,
            "Opening token session"
        );

        let session = SwiftSession::new(self.inner.http.clone(), endpoint.clone(), token);
        Ok(Arc::new(session))
    }

    async fn from_credentials(
        &self,
        account: &str,
        key: &str,
        endpoint: &Url,
    ) -> StoreResult<Arc<dyn Session>> {
        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            endpoint = %endpoint,
            account,
            "Authenticating account"
        );

        match self.authenticate(account, key, endpoint).await {
            Ok(session) => {
                tracing::info!(
                    target: TRACING_TARGET_CLIENT,
                    storage_url = %session.storage_url(),
                    account,
                    "Account authenticated"
                );
                Ok(Arc::new(session))
            }
            Err(e) => {
                tracing::warn!(
                    target: TRACING_TARGET_CLIENT,
                    endpoint = %endpoint,
                    account,
                    error = %e,
                    "Account authentication failed"
                );
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_sessions_need_no_round_trip() {
        let factory = SwiftSessionFactory::with_defaults().unwrap();
        let endpoint = Url::parse("http://127.0.0.1:9/v1/AUTH_test").unwrap();

        // nothing listens on the discard port; success proves no request was sent
        assert!(factory.from_token("token", &endpoint).await.is_ok());
    }

    #[tokio::test]
    async fn unreachable_identity_endpoint_is_a_transport_failure() {
        let factory = SwiftSessionFactory::new(SwiftConfig::default().with_timeout(2)).unwrap();
        let endpoint = Url::parse("http://127.0.0.1:9/auth/v1.0").unwrap();

        let err = factory
            .from_credentials("account", "key", &endpoint)
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), nvisy_stream::StoreErrorKind::Transport);
        assert!(err.is_retryable());
    }

    #[test]
    fn debug_shows_config() {
        let factory = SwiftSessionFactory::with_defaults().unwrap();
        assert!(format!("{factory:?}").contains("SwiftConfig"));
    }
}
