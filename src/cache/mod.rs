//! Time-bounded in-memory cache with single-flight loads.
//!
//! [`TtlCache`] maps request keys to the last value a loader produced.
//! Entries expire lazily: nothing sweeps the table, an entry is simply not
//! served once the clock passes its expiry. Expired entries stay readable
//! through [`TtlCache::last_known`] until a later load replaces them, which
//! is what lets callers fall back to stale data during an outage.
//!
//! Only one load per key runs at a time. Callers that arrive while a load
//! is in flight await the same result instead of starting their own. Loads
//! run on a spawned task, so a caller that stops waiting never aborts the
//! load for everyone else.

mod entry;
mod error;


pub use entry::CacheEntry;
pub use error::CacheLoadError;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use mockable::Clock;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Outcome of a cache lookup that may have triggered a load.
pub type LoadOutcome<V, E> = Result<CacheEntry<V>, CacheLoadError<E>>;

type PendingLoad<V, E> = Shared<BoxFuture<'static, LoadOutcome<V, E>>>;

struct Slot<V, E> {
    entry: Option<CacheEntry<V>>,
    in_flight: Option<PendingLoad<V, E>>,
}

impl<V, E> Default for Slot<V, E> {
    fn default() -> Self {
        Self {
            entry: None,
            in_flight: None,
        }
    }
}

type SlotTable<K, V, E> = Mutex<HashMap<K, Slot<V, E>>>;

/// Critical sections never panic half-way, so a poisoned table is still
/// consistent.
fn lock_slots<K, V, E>(slots: &SlotTable<K, V, E>) -> MutexGuard<'_, HashMap<K, Slot<V, E>>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory cache keyed by request identity with lazy TTL expiry.
pub struct TtlCache<K, V, E, C> {
    slots: Arc<SlotTable<K, V, E>>,
    clock: Arc<C>,
}

impl<K, V, E, C> Clone for TtlCache<K, V, E, C> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<K, V, E, C> fmt::Debug for TtlCache<K, V, E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("keys", &lock_slots(&self.slots).len())
            .finish_non_exhaustive()
    }
}

impl<K, V, E, C> TtlCache<K, V, E, C>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates an empty cache reading time from `clock`.
    #[must_use]
    pub fn new(clock: Arc<C>) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Returns the live entry for `key`, loading it when absent or expired.
    ///
    /// `loader` is invoked at most once per load: callers that find a load
    /// already in flight for `key` wait for its result. A successful result
    /// is published with an expiry of `ttl` from the moment it completes;
    /// a failure is handed to every waiter and not cached.
    ///
    /// # Errors
    ///
    /// Returns [`CacheLoadError::Failed`] with the loader's error, or
    /// [`CacheLoadError::Aborted`] when the load task panicked.
    pub async fn get_or_load<F, Fut>(&self, key: K, ttl: Duration, loader: F) -> LoadOutcome<V, E>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let pending = {
            let mut table = lock_slots(&self.slots);
            let now = self.clock.utc();
            let slot = table.entry(key.clone()).or_default();
            if let Some(entry) = slot.entry.as_ref().filter(|entry| entry.is_live_at(now)) {
                tracing::debug!(?key, expires_at = %entry.expires_at(), "cache hit");
                return Ok(entry.clone());
            }
            let joined = slot.in_flight.clone();
            joined.unwrap_or_else(|| {
                tracing::debug!(?key, "cache miss, starting load");
                let started = self.spawn_load(key, ttl, loader());
                slot.in_flight = Some(started.clone());
                started
            })
        };
        pending.await
    }

    /// Returns the entry for `key` only while it is live.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<CacheEntry<V>> {
        let now = self.clock.utc();
        lock_slots(&self.slots)
            .get(key)
            .and_then(|slot| slot.entry.as_ref())
            .filter(|entry| entry.is_live_at(now))
            .cloned()
    }

    /// Returns the last published entry for `key`, live or expired.
    #[must_use]
    pub fn last_known(&self, key: &K) -> Option<CacheEntry<V>> {
        lock_slots(&self.slots)
            .get(key)
            .and_then(|slot| slot.entry.clone())
    }

    /// Drops the published entry for `key`.
    ///
    /// A load already in flight still completes and publishes. Returns
    /// whether an entry was removed.
    pub fn invalidate(&self, key: &K) -> bool {
        let mut table = lock_slots(&self.slots);
        let Some(slot) = table.get_mut(key) else {
            return false;
        };
        let removed = slot.entry.take().is_some();
        if slot.in_flight.is_none() {
            table.remove(key);
        }
        removed
    }

    /// Drops every published entry.
    pub fn invalidate_all(&self) {
        lock_slots(&self.slots).retain(|_, slot| {
            slot.entry = None;
            slot.in_flight.is_some()
        });
    }

    /// Returns the number of keys holding a published entry.
    #[must_use]
    pub fn len(&self) -> usize {
        lock_slots(&self.slots)
            .values()
            .filter(|slot| slot.entry.is_some())
            .count()
    }

    /// Reports whether no key holds a published entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn spawn_load<Fut>(&self, key: K, ttl: Duration, load: Fut) -> PendingLoad<V, E>
    where
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let slots = Arc::clone(&self.slots);
        let clock = Arc::clone(&self.clock);
        let publish_key = key.clone();
        let task = tokio::spawn(async move {
            let outcome = load.await;
            publish(&slots, clock.as_ref(), publish_key, ttl, outcome)
        });

        let slots_on_abort = Arc::clone(&self.slots);
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    tracing::error!(?key, error = %join_error, "cache load task aborted");
                    clear_in_flight(&mut lock_slots(&slots_on_abort), &key);
                    Err(CacheLoadError::Aborted(join_error.to_string()))
                }
            }
        }
        .boxed()
        .shared()
    }
}

/// Stores a load result and clears the in-flight marker atomically, so a
/// caller arriving after this point sees the published entry.
fn publish<K, V, E, C>(
    slots: &SlotTable<K, V, E>,
    clock: &C,
    key: K,
    ttl: Duration,
    outcome: Result<V, E>,
) -> LoadOutcome<V, E>
where
    K: Eq + Hash,
    V: Clone,
    C: Clock,
{
    let mut table = lock_slots(slots);
    match outcome {
        Ok(value) => {
            let entry = CacheEntry::new(value, clock.utc(), ttl);
            let slot = table.entry(key).or_default();
            slot.in_flight = None;
            slot.entry = Some(entry.clone());
            Ok(entry)
        }
        Err(err) => {
            clear_in_flight(&mut table, &key);
            Err(CacheLoadError::Failed(err))
        }
    }
}

/// Ends the in-flight load for `key`. A slot that never published an entry
/// is removed, so failed lookups do not accumulate.
fn clear_in_flight<K, V, E>(table: &mut HashMap<K, Slot<V, E>>, key: &K)
where
    K: Eq + Hash,
{
    let Some(slot) = table.get_mut(key) else {
        return;
    };
    slot.in_flight = None;
    if slot.entry.is_none() {
        table.remove(key);
    }
}
