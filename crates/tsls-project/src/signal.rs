//! Memoized multicast completion signals.
//!
//! An ensure-pipeline runs at most once while its signal is live; every
//! caller in that window polls the same shared future. Success keeps the
//! signal so later calls are free; failure evicts it before the error
//! reaches subscribers, so the next caller starts a fresh attempt.
//! Generation tokens keep a stale pipeline from evicting a signal installed
//! after an invalidation.

use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use url::Url;

use crate::error::ProjectError;

/// A cloneable handle on one pipeline run.
pub type SharedSignal<T> = Shared<BoxFuture<'static, Result<T, ProjectError>>>;

/// Single memoized slot, used for the three workspace-scope pipelines.
pub(crate) struct SignalSlot<T: Clone> {
    state: Mutex<SlotState<T>>,
}

struct SlotState<T: Clone> {
    generation: u64,
    signal: Option<SharedSignal<T>>,
}

impl<T: Clone> SignalSlot<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                generation: 0,
                signal: None,
            }),
        }
    }

    /// Returns the live signal, or installs the one `make` builds. `make`
    /// receives the generation token the pipeline must present to
    /// [`evict`](Self::evict) itself on failure.
    pub(crate) fn get_or_install(
        &self,
        make: impl FnOnce(u64) -> SharedSignal<T>,
    ) -> SharedSignal<T> {
        let mut state = self.state.lock();
        if let Some(signal) = &state.signal {
            return signal.clone();
        }
        let signal = make(state.generation);
        state.signal = Some(signal.clone());
        signal
    }

    /// Clears the slot if `generation` still names the installed signal.
    pub(crate) fn evict(&self, generation: u64) {
        let mut state = self.state.lock();
        if state.generation == generation {
            state.generation += 1;
            state.signal = None;
        }
    }

    /// Unconditionally clears the slot; in-flight runs keep executing but
    /// can no longer evict their successor.
    pub(crate) fn invalidate(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.signal = None;
    }

    #[cfg(test)]
    pub(crate) fn is_live(&self) -> bool {
        self.state.lock().signal.is_some()
    }
}

/// URI-keyed signal map, used for the referenced-files cache.
pub(crate) struct SignalMap<T: Clone> {
    state: Mutex<MapState<T>>,
}

struct MapState<T: Clone> {
    next_token: u64,
    entries: FxHashMap<Url, (u64, SharedSignal<T>)>,
}

impl<T: Clone> SignalMap<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(MapState {
                next_token: 0,
                entries: FxHashMap::default(),
            }),
        }
    }

    /// Returns the live signal for `key`, or installs the one `make`
    /// builds, handing it the token for self-eviction.
    pub(crate) fn get_or_install(
        &self,
        key: &Url,
        make: impl FnOnce(u64) -> SharedSignal<T>,
    ) -> SharedSignal<T> {
        let mut state = self.state.lock();
        if let Some((_, signal)) = state.entries.get(key) {
            return signal.clone();
        }
        let token = state.next_token;
        state.next_token += 1;
        let signal = make(token);
        state.entries.insert(key.clone(), (token, signal.clone()));
        signal
    }

    /// Removes the entry for `key` if `token` still names it.
    pub(crate) fn evict(&self, key: &Url, token: u64) {
        let mut state = self.state.lock();
        if state
            .entries
            .get(key)
            .is_some_and(|(installed, _)| *installed == token)
        {
            state.entries.remove(key);
        }
    }

    /// Drops the entry for `key` regardless of who installed it.
    pub(crate) fn remove(&self, key: &Url) {
        self.state.lock().entries.remove(key);
    }

    /// Drops every entry.
    pub(crate) fn clear(&self) {
        self.state.lock().entries.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.state.lock().entries.len()
    }
}
