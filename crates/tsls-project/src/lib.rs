//! `tsls-project` - Workspace project manager for the tsls language server.
//!
//! Sits between an LSP dispatcher and the on-demand analyzer defined by
//! `tsls-analyzer`. Given a workspace root, it discovers the sub-project
//! structure implied by `tsconfig.json` / `jsconfig.json` files, lazily
//! materializes file content from a backing store, and maintains one
//! compiler session per sub-project:
//!
//! - **Routing**: [`ProjectRouter`] maps every file to its nearest
//!   enclosing configuration, with synthetic fallbacks at the root
//! - **Materialization**: [`ProjectManager`] exposes four memoized,
//!   multi-subscriber ensure-pipelines over a [`ContentFetcher`]
//! - **Sessions**: [`ProjectSession`] stages files into a compiler host in
//!   three tiers and drives cache invalidation through version counters
//! - **Intake**: `did_open` / `did_change` / `did_close` / `did_save`
//!   keep the store and versions in step with the editor
//!
//! The manager does not answer semantic queries, does not watch the disk,
//! and holds no state across restarts; those concerns belong to its
//! collaborators.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod fetcher;
pub mod host;
pub mod manager;
pub mod paths;
pub mod router;
pub mod session;
mod signal;
#[cfg(test)]
mod test_support;
pub mod vfs;

pub use config::{ConfigFileJson, ParsedProjectConfig};
pub use error::{ProjectError, Result};
pub use fetcher::{ContentFetcher, LocalFetcher};
pub use host::AnalyzerHost;
pub use manager::{ProjectManager, DEFAULT_REFERENCE_DEPTH};
pub use paths::ConfigKind;
pub use router::ProjectRouter;
pub use session::ProjectSession;
pub use vfs::{AddedCallback, MemoryVfs, SubscriptionId, Vfs};
