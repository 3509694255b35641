//! In-process object store implementing every collaborator trait.
//!
//! [`MemoryStore`] backs the test-suite and dry runs of the CLI. It counts
//! every remote-equivalent call so callers can assert which round trips an
//! operation made, and it can inject transport failures into individual calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use jiff::Timestamp;
use url::Url;

use crate::error::{StoreError, StoreResult};
use crate::store::{
    Container, Lookup, ObjectInfo, RemoteObject, Session, SessionFactory, Visibility,
};

const LABEL: &str = "memory";

#[derive(Debug, Clone)]
struct StoredObject {
    content: Bytes,
    last_modified: Timestamp,
}

impl StoredObject {
    fn info(&self, name: &str) -> ObjectInfo {
        ObjectInfo {
            name: name.to_owned(),
            content_length: self.content.len() as u64,
            last_modified: Some(self.last_modified),
        }
    }
}

#[derive(Debug)]
struct StoredContainer {
    visibility: Visibility,
    objects: HashMap<String, StoredObject>,
}

#[derive(Debug, Default)]
struct State {
    containers: HashMap<String, StoredContainer>,
    token: Option<String>,
    account: Option<(String, String)>,
    failing_fetches: usize,
    failing_saves: usize,
    failing_deletes: usize,
}

#[derive(Debug, Default)]
struct Counters {
    sessions: AtomicUsize,
    containers: AtomicUsize,
    fetches: AtomicUsize,
    heads: AtomicUsize,
    saves: AtomicUsize,
    deletes: AtomicUsize,
}

/// Snapshot of how many times each collaborator call was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallCounts {
    pub sessions: usize,
    pub containers: usize,
    pub fetches: usize,
    pub heads: usize,
    pub saves: usize,
    pub deletes: usize,
}

impl CallCounts {
    /// Total number of calls that would have reached the network.
    pub fn total(&self) -> usize {
        self.sessions + self.containers + self.fetches + self.heads + self.saves + self.deletes
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<State>,
    counters: Counters,
}

/// Cloneable handle to a shared in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Creates an empty store that accepts any credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts only this token for token sessions.
    #[must_use]
    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.state().token = Some(token.into());
        self
    }

    /// Accepts only this account/key pair for credential sessions.
    #[must_use]
    pub fn with_account(self, account: impl Into<String>, key: impl Into<String>) -> Self {
        self.state().account = Some((account.into(), key.into()));
        self
    }

    /// Creates a container, or changes the visibility of an existing one.
    #[must_use]
    pub fn with_container(self, name: impl Into<String>, visibility: Visibility) -> Self {
        self.create_container(name, visibility);
        self
    }

    /// Creates a container, or changes the visibility of an existing one.
    pub fn create_container(&self, name: impl Into<String>, visibility: Visibility) {
        self.state()
            .containers
            .entry(name.into())
            .and_modify(|c| c.visibility = visibility)
            .or_insert_with(|| StoredContainer {
                visibility,
                objects: HashMap::new(),
            });
    }

    /// Stores an object directly, without counting a save. Creates the
    /// container as private if it does not exist.
    pub fn insert(&self, container: &str, path: &str, content: impl Into<Bytes>) {
        let mut state = self.state();
        let stored = state
            .containers
            .entry(container.to_owned())
            .or_insert_with(|| StoredContainer {
                visibility: Visibility::Private,
                objects: HashMap::new(),
            });
        stored.objects.insert(
            path.to_owned(),
            StoredObject {
                content: content.into(),
                last_modified: Timestamp::now(),
            },
        );
    }

    /// Returns the stored content of an object, without counting a fetch.
    pub fn get(&self, container: &str, path: &str) -> Option<Bytes> {
        self.state()
            .containers
            .get(container)?
            .objects
            .get(path)
            .map(|o| o.content.clone())
    }

    /// Makes the next `count` fetches fail with a retryable transport error.
    ///
    /// Both full fetches and metadata-only lookups consume the count.
    pub fn fail_next_fetches(&self, count: usize) {
        self.state().failing_fetches = count;
    }

    /// Makes the next `count` saves fail with a retryable transport error.
    pub fn fail_next_saves(&self, count: usize) {
        self.state().failing_saves = count;
    }

    /// Makes the next `count` deletes fail with a retryable transport error.
    pub fn fail_next_deletes(&self, count: usize) {
        self.state().failing_deletes = count;
    }

    /// Returns the call counters.
    pub fn calls(&self) -> CallCounts {
        let c = &self.inner.counters;
        CallCounts {
            sessions: c.sessions.load(Ordering::Relaxed),
            containers: c.containers.load(Ordering::Relaxed),
            fetches: c.fetches.load(Ordering::Relaxed),
            heads: c.heads.load(Ordering::Relaxed),
            saves: c.saves.load(Ordering::Relaxed),
            deletes: c.deletes.load(Ordering::Relaxed),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn session(&self) -> Arc<dyn Session> {
        self.inner.counters.sessions.fetch_add(1, Ordering::Relaxed);
        Arc::new(MemorySession {
            store: self.clone(),
        })
    }
}

#[async_trait::async_trait]
impl SessionFactory for MemoryStore {
    async fn from_token(&self, token: &str, _endpoint: &Url) -> StoreResult<Arc<dyn Session>> {
        let accepted = match &self.state().token {
            Some(expected) => expected == token,
            None => true,
        };
        if !accepted {
            return Err(StoreError::unauthorized("token rejected", LABEL));
        }
        Ok(self.session())
    }

    async fn from_credentials(
        &self,
        account: &str,
        key: &str,
        _endpoint: &Url,
    ) -> StoreResult<Arc<dyn Session>> {
        let accepted = match &self.state().account {
            Some((a, k)) => a == account && k == key,
            None => true,
        };
        if !accepted {
            return Err(StoreError::unauthorized("account or key rejected", LABEL));
        }
        Ok(self.session())
    }
}

#[derive(Debug)]
struct MemorySession {
    store: MemoryStore,
}

#[async_trait::async_trait]
impl Session for MemorySession {
    async fn container(&self, id: &str) -> StoreResult<Lookup<Arc<dyn Container>>> {
        let counters = &self.store.inner.counters;
        counters.containers.fetch_add(1, Ordering::Relaxed);

        if !self.store.state().containers.contains_key(id) {
            return Ok(Lookup::NotFound);
        }
        Ok(Lookup::Found(Arc::new(MemoryContainer {
            store: self.store.clone(),
            name: id.to_owned(),
        })))
    }
}

#[derive(Debug)]
struct MemoryContainer {
    store: MemoryStore,
    name: String,
}

impl MemoryContainer {
    fn missing_container(&self) -> StoreError {
        StoreError::transport(format!("container '{}' vanished", self.name), LABEL)
            .with_retryable(false)
    }
}

/// Consumes one pending injected failure, if any.
fn take_failure(pending: &mut usize, message: &'static str) -> StoreResult<()> {
    if *pending > 0 {
        *pending -= 1;
        return Err(StoreError::transport(message, LABEL));
    }
    Ok(())
}

#[async_trait::async_trait]
impl Container for MemoryContainer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn acl(&self) -> StoreResult<Visibility> {
        let state = self.store.state();
        state
            .containers
            .get(&self.name)
            .map(|c| c.visibility)
            .ok_or_else(|| self.missing_container())
    }

    async fn object(&self, path: &str) -> StoreResult<Lookup<RemoteObject>> {
        let counters = &self.store.inner.counters;
        counters.fetches.fetch_add(1, Ordering::Relaxed);

        let mut state = self.store.state();
        take_failure(&mut state.failing_fetches, "injected fetch failure")?;
        let container = state
            .containers
            .get(&self.name)
            .ok_or_else(|| self.missing_container())?;

        Ok(container
            .objects
            .get(path)
            .map(|o| RemoteObject {
                info: o.info(path),
                content: o.content.clone(),
            })
            .into())
    }

    async fn head(&self, path: &str) -> StoreResult<Lookup<ObjectInfo>> {
        let counters = &self.store.inner.counters;
        counters.heads.fetch_add(1, Ordering::Relaxed);

        let mut state = self.store.state();
        take_failure(&mut state.failing_fetches, "injected fetch failure")?;
        let container = state
            .containers
            .get(&self.name)
            .ok_or_else(|| self.missing_container())?;

        Ok(container.objects.get(path).map(|o| o.info(path)).into())
    }

    async fn save(&self, object: &ObjectInfo, content: Bytes) -> StoreResult<ObjectInfo> {
        let counters = &self.store.inner.counters;
        counters.saves.fetch_add(1, Ordering::Relaxed);

        let mut state = self.store.state();
        take_failure(&mut state.failing_saves, "injected save failure")?;

        let container = state
            .containers
            .get_mut(&self.name)
            .ok_or_else(|| self.missing_container())?;

        let stored = StoredObject {
            content,
            last_modified: Timestamp::now(),
        };
        let info = stored.info(&object.name);
        container.objects.insert(object.name.clone(), stored);
        Ok(info)
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        let counters = &self.store.inner.counters;
        counters.deletes.fetch_add(1, Ordering::Relaxed);

        let mut state = self.store.state();
        take_failure(&mut state.failing_deletes, "injected delete failure")?;
        let container = state
            .containers
            .get_mut(&self.name)
            .ok_or_else(|| self.missing_container())?;

        match container.objects.remove(path) {
            Some(_) => Ok(()),
            None => Err(
                StoreError::transport(format!("object '{path}' not found"), LABEL)
                    .with_retryable(false),
            ),
        }
    }
}
