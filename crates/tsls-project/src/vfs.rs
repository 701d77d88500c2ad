//! Virtual file store.
//!
//! The store is the single source of truth for file content: sessions and
//! resolution never cache text themselves. A URI can be *known* (it
//! appeared in the workspace listing) before its content has been fetched;
//! existence checks see known URIs, reads see only fetched content. The
//! first time a URI gains content, `added` subscribers are told, which is
//! how the router discovers configuration files.

use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::paths;

/// Callback invoked when a URI gains content for the first time.
pub type AddedCallback = Arc<dyn Fn(&Url, &str) + Send + Sync>;

/// Handle returned by [`Vfs::subscribe_added`]; pass it back to
/// [`Vfs::unsubscribe`] to stop delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(pub u64);

/// In-memory view of the workspace.
pub trait Vfs: Send + Sync {
    /// True if the store knows `path`, fetched or not.
    fn file_exists(&self, path: &str) -> bool;
    /// Content for `path`, if fetched.
    fn read_file(&self, path: &str) -> Option<String>;
    /// Content for `uri`, if fetched.
    fn get_content(&self, uri: &Url) -> Option<String>;
    /// Every URI the store knows, fetched or not.
    fn uris(&self) -> Vec<Url>;
    /// Makes `uri` known without content. No event fires.
    fn register(&self, uri: &Url);
    /// Populates `uri` with fetched content.
    fn add(&self, uri: &Url, content: String);
    /// Editor opened the document.
    fn did_open(&self, uri: &Url, text: &str);
    /// Editor replaced the document content.
    fn did_change(&self, uri: &Url, text: &str);
    /// Editor closed the document. Content is retained.
    fn did_close(&self, uri: &Url);
    /// Editor saved the document.
    fn did_save(&self, uri: &Url);
    /// Registers an `added` subscriber.
    fn subscribe_added(&self, callback: AddedCallback) -> SubscriptionId;
    /// Removes an `added` subscriber.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// The default [`Vfs`] implementation: a URI-keyed map with `added`
/// subscriber bookkeeping and an open-document set.
#[derive(Default)]
pub struct MemoryVfs {
    files: RwLock<FxHashMap<Url, Option<String>>>,
    open: RwLock<FxHashSet<Url>>,
    subscribers: Mutex<Vec<(u64, AddedCallback)>>,
    next_subscription: AtomicU64,
}

impl MemoryVfs {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of known URIs.
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// True when the store knows no URI.
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    /// True while the editor holds `uri` open.
    pub fn is_open(&self, uri: &Url) -> bool {
        self.open.read().contains(uri)
    }

    fn set_content(&self, uri: &Url, content: String) {
        let first_population = {
            let mut files = self.files.write();
            !matches!(files.insert(uri.clone(), Some(content.clone())), Some(Some(_)))
        };
        if first_population {
            debug!("vfs added {uri}");
            // Snapshot the subscriber list so a callback can re-enter the
            // store without deadlocking.
            let subscribers: Vec<AddedCallback> = self
                .subscribers
                .lock()
                .iter()
                .map(|(_, callback)| Arc::clone(callback))
                .collect();
            for callback in subscribers {
                callback(uri, &content);
            }
        }
    }
}

impl Vfs for MemoryVfs {
    fn file_exists(&self, path: &str) -> bool {
        paths::path_to_uri(path)
            .map(|uri| self.files.read().contains_key(&uri))
            .unwrap_or(false)
    }

    fn read_file(&self, path: &str) -> Option<String> {
        let uri = paths::path_to_uri(path)?;
        self.files.read().get(&uri).cloned().flatten()
    }

    fn get_content(&self, uri: &Url) -> Option<String> {
        self.files.read().get(uri).cloned().flatten()
    }

    fn uris(&self) -> Vec<Url> {
        self.files.read().keys().cloned().collect()
    }

    fn register(&self, uri: &Url) {
        self.files.write().entry(uri.clone()).or_insert(None);
    }

    fn add(&self, uri: &Url, content: String) {
        self.set_content(uri, content);
    }

    fn did_open(&self, uri: &Url, text: &str) {
        self.open.write().insert(uri.clone());
        self.set_content(uri, text.to_string());
    }

    fn did_change(&self, uri: &Url, text: &str) {
        self.set_content(uri, text.to_string());
    }

    fn did_close(&self, uri: &Url) {
        self.open.write().remove(uri);
    }

    fn did_save(&self, _uri: &Url) {}

    fn subscribe_added(&self, callback: AddedCallback) -> SubscriptionId {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().push((id, callback));
        SubscriptionId(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.lock().retain(|(sub, _)| *sub != id.0);
    }
}
