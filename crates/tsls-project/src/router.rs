//! Project routing.
//!
//! Two directory-keyed session maps, one per [`ConfigKind`]. At
//! construction the trimmed workspace root holds a synthetic fallback
//! session for each kind; a real configuration file entering the store
//! creates a session at its directory and evicts the fallback of its kind.
//! Ownership queries walk from a file's directory up to the root and pick
//! the nearest session of the matching kind.

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::info;
use url::Url;

use tsls_analyzer::{Analyzer, DocumentRegistry};

use crate::config;
use crate::error::{ProjectError, Result};
use crate::paths::{self, ConfigKind};
use crate::session::ProjectSession;
use crate::vfs::{SubscriptionId, Vfs};

/// Tracks the `(directory, kind) -> session` maps and answers "which
/// session owns this file".
pub struct ProjectRouter {
    workspace_root: String,
    vfs: Arc<dyn Vfs>,
    registry: Arc<DocumentRegistry>,
    analyzer: Arc<dyn Analyzer>,
    versions: Arc<RwLock<FxHashMap<Url, u64>>>,
    trace_resolution: bool,
    ts: RwLock<FxHashMap<String, Arc<ProjectSession>>>,
    js: RwLock<FxHashMap<String, Arc<ProjectSession>>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl ProjectRouter {
    /// Creates a router over `workspace_root`, installs the two fallback
    /// sessions, and subscribes to the store's `added` events.
    pub fn new(
        workspace_root: &str,
        vfs: Arc<dyn Vfs>,
        registry: Arc<DocumentRegistry>,
        analyzer: Arc<dyn Analyzer>,
        versions: Arc<RwLock<FxHashMap<Url, u64>>>,
        trace_resolution: bool,
    ) -> Arc<Self> {
        let normalized = paths::normalize_separators(workspace_root);
        let router = Arc::new(Self {
            workspace_root: paths::trimmed_root(&normalized).to_string(),
            vfs,
            registry,
            analyzer,
            versions,
            trace_resolution,
            ts: RwLock::new(FxHashMap::default()),
            js: RwLock::new(FxHashMap::default()),
            subscription: Mutex::new(None),
        });
        router.install_fallback(ConfigKind::Ts);
        router.install_fallback(ConfigKind::Js);

        let weak = Arc::downgrade(&router);
        let id = router.vfs.subscribe_added(Arc::new(move |uri, content| {
            if let Some(router) = weak.upgrade() {
                router.on_file_added(uri, content);
            }
        }));
        *router.subscription.lock() = Some(id);
        router
    }

    /// The trimmed workspace root.
    pub fn workspace_root(&self) -> &str {
        &self.workspace_root
    }

    /// The nearest enclosing session for `path`, inferring the kind from
    /// the path when not given. Falls back to the root entry of the kind's
    /// map when no real project matches.
    pub fn configuration_for(
        &self,
        path: &str,
        kind: Option<ConfigKind>,
    ) -> Option<Arc<ProjectSession>> {
        let normalized = paths::normalize_separators(path);
        let kind = kind.unwrap_or_else(|| paths::kind_of_path(&normalized));
        let map = self.map_for(kind).read();
        let mut dir = paths::parent_dir(&normalized)?.to_string();
        loop {
            if let Some(session) = map.get(&dir) {
                return Some(Arc::clone(session));
            }
            if dir.len() <= self.workspace_root.len() {
                break;
            }
            match paths::parent_dir(&dir) {
                Some(parent) => dir = parent.to_string(),
                None => break,
            }
        }
        map.get(&self.workspace_root).cloned()
    }

    /// Throwing variant of [`configuration_for`](Self::configuration_for).
    pub fn get_configuration(
        &self,
        path: &str,
        kind: Option<ConfigKind>,
    ) -> Result<Arc<ProjectSession>> {
        self.configuration_for(path, kind)
            .ok_or_else(|| ProjectError::ConfigNotFound {
                path: path.to_string(),
            })
    }

    /// The session registered exactly at `(kind, dir)`, if any.
    pub fn configuration_at(&self, kind: ConfigKind, dir: &str) -> Option<Arc<ProjectSession>> {
        self.map_for(kind).read().get(paths::trimmed_root(dir)).cloned()
    }

    /// Every session whose directory starts with `dir`, js kind first.
    pub fn child_configurations(&self, dir: &str) -> Vec<Arc<ProjectSession>> {
        let prefix = paths::trimmed_root(&paths::normalize_separators(dir)).to_string();
        let mut sessions = Vec::new();
        for map in [&self.js, &self.ts] {
            for (key, session) in map.read().iter() {
                if key.starts_with(&prefix) {
                    sessions.push(Arc::clone(session));
                }
            }
        }
        sessions
    }

    /// Every session, js kind first.
    pub fn all_configurations(&self) -> Vec<Arc<ProjectSession>> {
        let mut sessions: Vec<Arc<ProjectSession>> =
            self.js.read().values().cloned().collect();
        sessions.extend(self.ts.read().values().cloned());
        sessions
    }

    /// Tears down the store subscription. Sessions stay usable.
    pub fn dispose(&self) {
        if let Some(id) = self.subscription.lock().take() {
            self.vfs.unsubscribe(id);
        }
    }

    fn map_for(&self, kind: ConfigKind) -> &RwLock<FxHashMap<String, Arc<ProjectSession>>> {
        match kind {
            ConfigKind::Ts => &self.ts,
            ConfigKind::Js => &self.js,
        }
    }

    fn install_fallback(&self, kind: ConfigKind) {
        let session = ProjectSession::new(
            Arc::clone(&self.vfs),
            Arc::clone(&self.registry),
            Arc::clone(&self.analyzer),
            self.workspace_root.clone(),
            self.workspace_root.clone(),
            String::new(),
            Some(config::fallback_config(kind)),
            Arc::clone(&self.versions),
            self.trace_resolution,
            true,
        );
        self.map_for(kind)
            .write()
            .insert(self.workspace_root.clone(), session);
    }

    fn on_file_added(&self, uri: &Url, content: &str) {
        if content.is_empty() {
            return;
        }
        let Some(path) = paths::uri_to_path(uri) else {
            return;
        };
        if paths::in_node_modules(&path) {
            return;
        }
        let Some(kind) = paths::config_kind_of_config(&path) else {
            return;
        };
        let Some(dir) = paths::parent_dir(&path) else {
            return;
        };
        let dir = dir.to_string();

        let mut map = self.map_for(kind).write();
        if map.get(&dir).is_some_and(|existing| !existing.is_fallback()) {
            return;
        }
        info!("creating project session for {path}");
        let session = ProjectSession::new(
            Arc::clone(&self.vfs),
            Arc::clone(&self.registry),
            Arc::clone(&self.analyzer),
            self.workspace_root.clone(),
            dir.clone(),
            path,
            None,
            Arc::clone(&self.versions),
            self.trace_resolution,
            false,
        );
        map.insert(dir.clone(), session);
        if dir != self.workspace_root
            && map
                .get(&self.workspace_root)
                .is_some_and(|session| session.is_fallback())
        {
            map.remove(&self.workspace_root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{stub_analyzer, uri, vfs_with};
    use crate::vfs::MemoryVfs;

    fn router_over(vfs: Arc<MemoryVfs>) -> Arc<ProjectRouter> {
        ProjectRouter::new(
            "/w/",
            vfs,
            Arc::new(DocumentRegistry::new()),
            stub_analyzer(),
            Arc::new(RwLock::new(FxHashMap::default())),
            false,
        )
    }

    #[test]
    fn fallbacks_route_by_inferred_kind() {
        let router = router_over(vfs_with(&[]));
        let ts = router
            .configuration_for("/w/a.ts", None)
            .expect("ts fallback");
        assert!(ts.is_fallback());
        let js = router
            .configuration_for("/w/a.js", None)
            .expect("js fallback");
        assert!(js.is_fallback());
        assert!(!Arc::ptr_eq(&ts, &js));
    }

    #[test]
    fn config_arrival_creates_a_session_and_evicts_the_fallback() {
        let vfs = vfs_with(&[]);
        let router = router_over(Arc::clone(&vfs));
        vfs.add(&uri("/w/pkg/tsconfig.json"), "{}".to_string());

        let session = router
            .configuration_for("/w/pkg/sub/x.ts", None)
            .expect("session");
        assert_eq!(session.root(), "/w/pkg");
        assert!(!session.is_fallback());

        assert!(
            router.configuration_at(ConfigKind::Ts, "/w").is_none(),
            "ts fallback must be evicted"
        );
        assert!(
            router
                .configuration_at(ConfigKind::Js, "/w")
                .is_some_and(|session| session.is_fallback()),
            "js fallback stays"
        );
    }

    #[test]
    fn config_at_the_root_replaces_the_fallback_in_place() {
        let vfs = vfs_with(&[]);
        let router = router_over(Arc::clone(&vfs));
        vfs.add(&uri("/w/tsconfig.json"), "{}".to_string());

        let session = router
            .configuration_at(ConfigKind::Ts, "/w")
            .expect("root session");
        assert!(!session.is_fallback());
        assert_eq!(session.config_path(), "/w/tsconfig.json");
    }

    #[test]
    fn node_modules_configs_are_ignored() {
        let vfs = vfs_with(&[]);
        let router = router_over(Arc::clone(&vfs));
        vfs.add(&uri("/w/node_modules/dep/tsconfig.json"), "{}".to_string());

        assert!(router
            .configuration_at(ConfigKind::Ts, "/w/node_modules/dep")
            .is_none());
        assert!(
            router
                .configuration_at(ConfigKind::Ts, "/w")
                .is_some_and(|session| session.is_fallback()),
            "fallback must not be evicted"
        );
    }

    #[test]
    fn empty_content_does_not_create_a_session() {
        let vfs = vfs_with(&[]);
        let router = router_over(Arc::clone(&vfs));
        vfs.add(&uri("/w/pkg/tsconfig.json"), String::new());
        assert!(router.configuration_at(ConfigKind::Ts, "/w/pkg").is_none());
    }

    #[test]
    fn routing_picks_the_longest_prefix() {
        let vfs = vfs_with(&[]);
        let router = router_over(Arc::clone(&vfs));
        vfs.add(&uri("/w/tsconfig.json"), "{}".to_string());
        vfs.add(&uri("/w/pkg/tsconfig.json"), "{}".to_string());

        let nested = router
            .configuration_for("/w/pkg/sub/x.ts", None)
            .expect("nested session");
        assert_eq!(nested.root(), "/w/pkg");
        let top = router.configuration_for("/w/other.ts", None).expect("top");
        assert_eq!(top.root(), "/w");
    }

    #[test]
    fn explicit_kind_overrides_extension_inference() {
        let vfs = vfs_with(&[]);
        let router = router_over(Arc::clone(&vfs));
        vfs.add(&uri("/w/jsconfig.json"), "{}".to_string());

        let session = router
            .configuration_for("/w/a.ts", Some(ConfigKind::Js))
            .expect("js session");
        assert_eq!(session.config_path(), "/w/jsconfig.json");
    }

    #[test]
    fn child_and_all_configurations_enumerate_sessions() {
        let vfs = vfs_with(&[]);
        let router = router_over(Arc::clone(&vfs));
        vfs.add(&uri("/w/pkg/tsconfig.json"), "{}".to_string());
        vfs.add(&uri("/w/pkg/nested/tsconfig.json"), "{}".to_string());

        let children = router.child_configurations("/w/pkg");
        assert_eq!(children.len(), 2);
        // js fallback + two real ts sessions.
        assert_eq!(router.all_configurations().len(), 3);
    }

    #[test]
    fn dispose_stops_session_creation() {
        let vfs = vfs_with(&[]);
        let router = router_over(Arc::clone(&vfs));
        router.dispose();
        vfs.add(&uri("/w/pkg/tsconfig.json"), "{}".to_string());
        assert!(router.configuration_at(ConfigKind::Ts, "/w/pkg").is_none());
    }
}
