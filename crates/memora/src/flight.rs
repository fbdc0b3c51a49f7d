// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-key coalescing of concurrent computations.
//!
//! When several callers miss on the same key at once, exactly one of them
//! (the leader) runs the computation; the rest (followers) wait on the
//! leader's result slot and receive a clone of whatever lands there —
//! including a failure. Callers working on different keys never meet: the
//! shared map is only locked long enough to look up or insert a slot.
//!
//! If a leader is dropped before storing a result, the slot's lock is
//! released with the slot still empty; the first follower to acquire it
//! promotes itself and runs its own computation, so a cancelled caller
//! cannot strand the rest.

use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, Weak},
};

use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex as AsyncMutex;

/// One in-flight computation: leaders fill the slot, followers clone it.
struct Shared<T> {
    slot: AsyncMutex<Option<T>>,
}

/// Coalesces concurrent executions per key.
///
/// The map holds weak references so an abandoned flight (all callers
/// dropped) cannot pin its result forever; completed flights remove their
/// entry on the way out.
pub(crate) struct Flight<K, T> {
    calls: SyncMutex<HashMap<K, Weak<Shared<T>>>>,
}

impl<K, T> std::fmt::Debug for Flight<K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flight").field("in_flight", &self.calls.lock().len()).finish()
    }
}

impl<K, T> Flight<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            calls: SyncMutex::new(HashMap::new()),
        }
    }

    /// Runs `func` under single-flight for `key`.
    ///
    /// At most one caller executes `func` at a time per key; every caller
    /// that joined while the flight was open receives a clone of the first
    /// stored result.
    pub(crate) async fn run<F, Fut>(&self, key: K, func: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let (shared, is_leader) = {
            let mut calls = self.calls.lock();
            match calls.get(&key).and_then(Weak::upgrade) {
                Some(shared) => (shared, false),
                None => {
                    let shared = Arc::new(Shared {
                        slot: AsyncMutex::new(None),
                    });
                    calls.insert(key.clone(), Arc::downgrade(&shared));
                    (shared, true)
                }
            }
        };

        if is_leader {
            self.lead(&shared, &key, func).await
        } else {
            self.follow(&shared, &key, func).await
        }
    }

    /// Executes the work while holding the slot lock, so followers block
    /// until the result is stored.
    async fn lead<F, Fut>(&self, shared: &Arc<Shared<T>>, key: &K, func: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut slot = shared.slot.lock().await;

        // A promoted follower may already have filled the slot.
        if let Some(value) = slot.as_ref() {
            return value.clone();
        }

        let value = func().await;
        *slot = Some(value.clone());
        drop(slot);

        self.calls.lock().remove(key);
        value
    }

    async fn follow<F, Fut>(&self, shared: &Arc<Shared<T>>, key: &K, func: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        {
            let slot = shared.slot.lock().await;
            if let Some(value) = slot.as_ref() {
                return value.clone();
            }
        }

        // The slot unlocked while still empty: every leader was dropped
        // before storing. Promote and run our own computation.
        self.lead(shared, key, func).await
    }
}
