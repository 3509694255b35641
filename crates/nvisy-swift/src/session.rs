//! Authenticated Swift sessions and their containers.

use std::sync::Arc;

use bytes::Bytes;
use jiff::Timestamp;
use nvisy_stream::StoreResult;
use nvisy_stream::store::{Container, Lookup, ObjectInfo, RemoteObject, Session, Visibility};
use reqwest::{Client, Method, Response, StatusCode};
use url::Url;

use crate::TRACING_TARGET_OBJECT;
use crate::error::{Error, Result};
use crate::metadata::{
    AUTH_TOKEN, CONTAINER_READ, header, last_modified, object_info, resource_url, visibility,
};

struct SwiftSessionInner {
    http: Client,
    storage_url: Url,
    token: String,
}

/// A token plus the storage URL it is valid for.
#[derive(Clone)]
pub struct SwiftSession {
    inner: Arc<SwiftSessionInner>,
}

impl std::fmt::Debug for SwiftSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwiftSession")
            .field("storage_url", &self.inner.storage_url.as_str())
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl SwiftSession {
    /// Creates a session from an existing token.
    pub fn new(http: Client, storage_url: Url, token: impl Into<String>) -> Self {
        let inner = SwiftSessionInner {
            http,
            storage_url,
            token: token.into(),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Returns the account storage URL.
    pub fn storage_url(&self) -> &Url {
        &self.inner.storage_url
    }

    fn url(&self, container: &str, object: Option<&str>) -> Result<Url> {
        resource_url(&self.inner.storage_url, container, object)
    }

    /// Sends an authenticated request.
    ///
    /// Returns `None` on `404`, the response on success and an error otherwise.
    async fn send(&self, method: Method, url: Url, body: Option<Bytes>) -> Result<Option<Response>> {
        let mut request = self
            .inner
            .http
            .request(method.clone(), url.clone())
            .header(AUTH_TOKEN, &self.inner.token);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();

        tracing::trace!(
            target: TRACING_TARGET_OBJECT,
            %method,
            %url,
            status = status.as_u16(),
            "Swift request completed"
        );

        match status {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(response)),
            status => Err(Error::Status {
                method,
                url: url.to_string(),
                status,
            }),
        }
    }
}

#[async_trait::async_trait]
impl Session for SwiftSession {
    async fn container(&self, id: &str) -> StoreResult<Lookup<Arc<dyn Container>>> {
        let url = self.url(id, None)?;
        let Some(response) = self.send(Method::HEAD, url, None).await? else {
            return Ok(Lookup::NotFound);
        };

        let read_acl = header(response.headers(), CONTAINER_READ);
        let container = SwiftContainer {
            session: self.clone(),
            name: id.to_owned(),
            visibility: visibility(read_acl),
        };

        tracing::debug!(
            target: TRACING_TARGET_OBJECT,
            container = %id,
            visibility = %container.visibility,
            "Container found"
        );

        Ok(Lookup::Found(Arc::new(container)))
    }
}

/// A container within a [`SwiftSession`].
///
/// The read ACL is captured by the lookup that produced the container and is
/// not refreshed afterwards.
#[derive(Debug, Clone)]
pub struct SwiftContainer {
    session: SwiftSession,
    name: String,
    visibility: Visibility,
}

#[async_trait::async_trait]
impl Container for SwiftContainer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn acl(&self) -> StoreResult<Visibility> {
        Ok(self.visibility)
    }

    async fn object(&self, path: &str) -> StoreResult<Lookup<RemoteObject>> {
        let url = self.session.url(&self.name, Some(path))?;
        let Some(response) = self.session.send(Method::GET, url, None).await? else {
            return Ok(Lookup::NotFound);
        };

        let headers = response.headers().clone();
        let content = response.bytes().await.map_err(Error::from)?;
        let info = object_info(path, &headers, Some(content.len() as u64));

        tracing::debug!(
            target: TRACING_TARGET_OBJECT,
            container = %self.name,
            object = %path,
            size = content.len(),
            "Object fetched"
        );

        Ok(Lookup::Found(RemoteObject { info, content }))
    }

    async fn head(&self, path: &str) -> StoreResult<Lookup<ObjectInfo>> {
        let url = self.session.url(&self.name, Some(path))?;
        let Some(response) = self.session.send(Method::HEAD, url, None).await? else {
            return Ok(Lookup::NotFound);
        };

        Ok(Lookup::Found(object_info(path, response.headers(), None)))
    }

    async fn save(&self, object: &ObjectInfo, content: Bytes) -> StoreResult<ObjectInfo> {
        let url = self.session.url(&self.name, Some(&object.name))?;
        let size = content.len() as u64;

        let response = self
            .session
            .send(Method::PUT, url.clone(), Some(content))
            .await?
            .ok_or_else(|| Error::Status {
                method: Method::PUT,
                url: url.to_string(),
                status: StatusCode::NOT_FOUND,
            })?;

        tracing::debug!(
            target: TRACING_TARGET_OBJECT,
            container = %self.name,
            object = %object.name,
            size,
            "Object saved"
        );

        Ok(ObjectInfo {
            name: object.name.clone(),
            content_length: size,
            last_modified: last_modified(response.headers()).or_else(|| Some(Timestamp::now())),
        })
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        let url = self.session.url(&self.name, Some(path))?;

        match self.session.send(Method::DELETE, url.clone(), None).await? {
            Some(_) => Ok(()),
            None => Err(Error::Status {
                method: Method::DELETE,
                url: url.to_string(),
                status: StatusCode::NOT_FOUND,
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SwiftSession {
        SwiftSession::new(
            Client::new(),
            Url::parse("https://swift.example.com/v1/AUTH_test").unwrap(),
            "secret-token",
        )
    }

    #[test]
    fn debug_redacts_token() {
        let output = format!("{:?}", session());
        assert!(output.contains("AUTH_test"));
        assert!(!output.contains("secret-token"));
    }

    #[test]
    fn object_urls_are_scoped_to_the_storage_url() {
        let url = session().url("docs", Some("nested/file name.txt")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://swift.example.com/v1/AUTH_test/docs/nested/file%20name.txt"
        );
    }
}
