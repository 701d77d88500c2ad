//! Shared document registry.
//!
//! Every compilation session of a workspace shares one registry so that a
//! file staged into several sessions is held (and parsed by the analyzer)
//! once. Snapshots are keyed by content hash; a path re-acquired with
//! changed text releases its old snapshot and joins (or creates) the bucket
//! for the new hash.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::hash::Hasher;
use std::sync::Arc;
use tracing::debug;

/// Content-hash keyed cache of document snapshots, shared across sessions.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    inner: RwLock<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    by_hash: FxHashMap<u64, SharedDocument>,
    by_path: FxHashMap<String, u64>,
}

#[derive(Debug)]
struct SharedDocument {
    text: Arc<str>,
    ref_count: usize,
}

impl DocumentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires a shared snapshot of `text` for `path`.
    ///
    /// Identical content already held by any path returns the existing
    /// snapshot; a path whose content changed releases its previous bucket
    /// first.
    pub fn acquire(&self, path: &str, text: &str) -> Arc<str> {
        let hash = content_hash(text);
        let mut inner = self.inner.write();
        if let Some(previous) = inner.by_path.get(path).copied() {
            if previous == hash {
                if let Some(doc) = inner.by_hash.get(&previous) {
                    return Arc::clone(&doc.text);
                }
            }
            release_hash(&mut inner, previous);
        }
        inner.by_path.insert(path.to_string(), hash);
        let doc = inner
            .by_hash
            .entry(hash)
            .or_insert_with(|| SharedDocument {
                text: Arc::from(text),
                ref_count: 0,
            });
        doc.ref_count += 1;
        Arc::clone(&doc.text)
    }

    /// Releases the snapshot held for `path`, dropping the bucket when the
    /// last holder departs.
    pub fn release(&self, path: &str) {
        let mut inner = self.inner.write();
        if let Some(hash) = inner.by_path.remove(path) {
            release_hash(&mut inner, hash);
        }
    }

    /// Number of distinct snapshots currently held.
    pub fn len(&self) -> usize {
        self.inner.read().by_hash.len()
    }

    /// Returns true when no snapshot is held.
    pub fn is_empty(&self) -> bool {
        self.inner.read().by_hash.is_empty()
    }
}

fn release_hash(inner: &mut RegistryInner, hash: u64) {
    if let Some(doc) = inner.by_hash.get_mut(&hash) {
        doc.ref_count = doc.ref_count.saturating_sub(1);
        if doc.ref_count == 0 {
            inner.by_hash.remove(&hash);
            debug!("dropped document snapshot {hash:#018x}");
        }
    }
}

fn content_hash(text: &str) -> u64 {
    let mut hasher = rustc_hash::FxHasher::default();
    hasher.write(text.as_bytes());
    hasher.finish()
}
