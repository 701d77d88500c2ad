//! Error types for the workspace core.

use thiserror::Error;

/// Errors surfaced by the project manager and its pipelines.
///
/// The enum is `Clone` so completion signals can fan a failure out to every
/// subscriber; all payloads are pre-rendered strings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProjectError {
    /// A project configuration file failed to parse. The owning session
    /// stays uninitialized and the next staging call re-attempts.
    #[error("failed to parse {path}: {message}")]
    ConfigParse {
        /// Path of the offending configuration file.
        path: String,
        /// Parser diagnostic.
        message: String,
    },

    /// No project configuration owns the given path.
    #[error("no project configuration found for {path}")]
    ConfigNotFound {
        /// The unrouted file path.
        path: String,
    },

    /// A fetch issued by an ensure-pipeline failed.
    #[error("fetch failed for {uri}: {message}")]
    Fetch {
        /// The URI (or scope description) being fetched.
        uri: String,
        /// Failure detail from the fetcher.
        message: String,
    },

    /// Resolving the references of a file failed.
    #[error("failed to resolve references of {uri}: {message}")]
    ReferenceResolution {
        /// The referencing file.
        uri: String,
        /// Failure detail.
        message: String,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ProjectError>;
