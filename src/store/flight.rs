//! Single-flight loads
//!
//! At most one fetch per key is in flight. Late callers join the pending
//! future instead of starting another. The fetch runs on its own task, so a
//! caller that gives up does not cancel it for everyone else.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use super::StoreError;

pub type SharedLoad<V> = Shared<BoxFuture<'static, Result<V, StoreError>>>;

/// Outcome of [`Flights::join_or_start`]
pub enum Joined<V> {
    /// The value landed in the cache while we were looking
    Ready(V),
    /// Await this; `coalesced` is true when another caller started it
    Flight { load: SharedLoad<V>, coalesced: bool },
}

/// Table of in-flight loads keyed by `K`
pub struct Flights<K, V> {
    pending: Mutex<HashMap<K, SharedLoad<V>>>,
}

impl<K, V> Default for Flights<K, V> {
    fn default() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> Flights<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Join the load for `key`, or start one with `start`
    ///
    /// `cached` is consulted under the pending lock. The started future must
    /// publish its value to the cache before it resolves; the pending entry is
    /// removed only after that, so a caller never misses both.
    pub fn join_or_start<Fut>(
        self: &Arc<Self>,
        key: &K,
        cached: impl FnOnce() -> Option<V>,
        start: impl FnOnce() -> Fut,
    ) -> Joined<V>
    where
        Fut: Future<Output = Result<V, StoreError>> + Send + 'static,
    {
        let mut pending = self.pending.lock();

        if let Some(load) = pending.get(key) {
            return Joined::Flight {
                load: load.clone(),
                coalesced: true,
            };
        }
        if let Some(value) = cached() {
            return Joined::Ready(value);
        }

        let landing = Landing {
            flights: Arc::clone(self),
            key: key.clone(),
        };
        let work = start();
        let handle = tokio::spawn(async move {
            let _landing = landing;
            work.await
        });

        let load = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(StoreError::Fetch {
                    path: String::new(),
                    message: format!("load task failed: {}", e),
                }),
            }
        }
        .boxed()
        .shared();

        pending.insert(key.clone(), load.clone());
        Joined::Flight {
            load,
            coalesced: false,
        }
    }

    /// Number of loads currently in flight
    pub fn in_flight(&self) -> usize {
        self.pending.lock().len()
    }
}

/// Clears the pending entry when the fetch task ends, even by panic
struct Landing<K: Eq + Hash, V> {
    flights: Arc<Flights<K, V>>,
    key: K,
}

impl<K: Eq + Hash, V> Drop for Landing<K, V> {
    fn drop(&mut self) {
        self.flights.pending.lock().remove(&self.key);
    }
}
