//! An in-process repository with fault injection.
use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Fetched, RepoError, Repository};
use crate::content::ContentObject;
use crate::name::Name;

#[derive(Debug, Default)]
struct Inner {
    objects: BTreeMap<Name, ContentObject>,
    fetches: usize,
    publishes: usize,
    timeouts: usize,
    rejecting: bool,
    offline: bool,
}

/// A repository held in memory. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` fetches time out.
    pub fn time_out_next(&self, n: usize) {
        self.inner.lock().timeouts = n;
    }

    /// Refuse every publish from now on.
    pub fn reject_publishes(&self) {
        self.inner.lock().rejecting = true;
    }

    /// Fail every call as if the connection dropped.
    pub fn go_offline(&self) {
        self.inner.lock().offline = true;
    }

    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.inner.lock().fetches
    }

    #[must_use]
    pub fn publish_count(&self) -> usize {
        self.inner.lock().publishes
    }

    #[must_use]
    pub fn get(&self, name: &Name) -> Option<ContentObject> {
        self.inner.lock().objects.get(name).cloned()
    }

    /// Every stored name, in order.
    #[must_use]
    pub fn names(&self) -> Vec<Name> {
        self.inner.lock().objects.keys().cloned().collect()
    }
}

fn offline() -> RepoError {
    RepoError::Unavailable(io::Error::new(io::ErrorKind::NotConnected, "repository offline"))
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn fetch(&mut self, name: &Name, _timeout: Duration) -> Result<Fetched, RepoError> {
        let mut inner = self.inner.lock();
        inner.fetches += 1;
        if inner.offline {
            return Err(offline());
        }
        if inner.timeouts > 0 {
            inner.timeouts -= 1;
            return Err(RepoError::Timeout(name.clone()));
        }
        let found = inner
            .objects
            .range(name.clone()..)
            .take_while(|(n, _)| name.is_prefix_of(n))
            .last()
            .map(|(_, o)| o.clone());
        Ok(found.map_or(Fetched::NotFound, Fetched::Found))
    }

    async fn publish(&mut self, object: &ContentObject) -> Result<(), RepoError> {
        let mut inner = self.inner.lock();
        inner.publishes += 1;
        if inner.offline {
            return Err(offline());
        }
        if inner.rejecting {
            return Err(RepoError::Rejected(object.name().clone(), "read-only".into()));
        }
        inner.objects.insert(object.name().clone(), object.clone());
        Ok(())
    }
}
