//! Collaborator interfaces for the remote container/object store.
//!
//! A [`SessionFactory`] turns [`Credentials`] into a [`Session`], a session
//! looks up [`Container`]s, and a container fetches, saves and deletes
//! objects. Lookups that may legitimately miss return [`Lookup`] so that
//! "not found" is ordinary control flow, while transport failures travel in
//! the `Err` arm as [`StoreError`](crate::StoreError).

use std::sync::Arc;

use bytes::Bytes;
use derive_more::Display;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::Credentials;
use crate::error::StoreResult;

/// Outcome of a lookup that may legitimately find nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// The resource exists.
    Found(T),
    /// The resource does not exist.
    NotFound,
}

impl<T> Lookup<T> {
    /// Converts into an `Option`.
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }

    /// Whether the resource exists.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Maps the found value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Self::Found(value) => Lookup::Found(f(value)),
            Self::NotFound => Lookup::NotFound,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::NotFound, Self::Found)
    }
}

/// Container access-control visibility.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Anyone may read objects in the container.
    #[display("public")]
    Public,
    /// Only authenticated sessions may read objects.
    #[display("private")]
    Private,
}

/// Lightweight object metadata, available without transferring the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object path within its container.
    pub name: String,
    /// Content length in bytes.
    pub content_length: u64,
    /// Last remote modification, if the object has ever been stored.
    pub last_modified: Option<Timestamp>,
}

impl ObjectInfo {
    /// Describes an object that exists only locally so far.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content_length: 0,
            last_modified: None,
        }
    }

    /// Returns the modification time in whole seconds, `0` if never stored.
    pub fn mtime(&self) -> i64 {
        self.last_modified.map_or(0, |ts| ts.as_second())
    }
}

/// An object fetched together with its body.
#[derive(Debug, Clone)]
pub struct RemoteObject {
    /// Object metadata.
    pub info: ObjectInfo,
    /// Full object content.
    pub content: Bytes,
}

/// Creates sessions from credentials.
#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync {
    /// Opens a session with a pre-authenticated token.
    async fn from_token(&self, token: &str, endpoint: &Url) -> StoreResult<Arc<dyn Session>>;

    /// Authenticates with an account name and key.
    async fn from_credentials(
        &self,
        account: &str,
        key: &str,
        endpoint: &Url,
    ) -> StoreResult<Arc<dyn Session>>;

    /// Opens a session with whichever credential form was resolved.
    async fn connect(&self, credentials: &Credentials) -> StoreResult<Arc<dyn Session>> {
        match credentials {
            Credentials::Token { token, endpoint } => self.from_token(token, endpoint).await,
            Credentials::Account {
                account,
                key,
                endpoint,
            } => self.from_credentials(account, key, endpoint).await,
        }
    }
}

/// An authenticated session.
#[async_trait::async_trait]
pub trait Session: Send + Sync {
    /// Looks up a container. Always a remote round trip.
    async fn container(&self, id: &str) -> StoreResult<Lookup<Arc<dyn Container>>>;
}

/// A remote container of objects.
#[async_trait::async_trait]
pub trait Container: Send + Sync {
    /// Returns the container identifier.
    fn name(&self) -> &str;

    /// Returns the container's ACL visibility.
    async fn acl(&self) -> StoreResult<Visibility>;

    /// Fetches an object's metadata and full content.
    async fn object(&self, path: &str) -> StoreResult<Lookup<RemoteObject>>;

    /// Fetches an object's metadata without its content.
    async fn head(&self, path: &str) -> StoreResult<Lookup<ObjectInfo>>;

    /// Replaces the object's content, returning the stored metadata.
    async fn save(&self, object: &ObjectInfo, content: Bytes) -> StoreResult<ObjectInfo>;

    /// Deletes an object.
    async fn delete(&self, path: &str) -> StoreResult<()>;
}
