//! Error types surfaced by the synchroniser and its storage backends.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Failures talking to the remote object store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Transport-level failure (DNS, TLS, connection reset, ...).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("{url} returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
        /// Response body, usually a JSON error document.
        body: String,
    },
    /// A listing page could not be decoded.
    #[error("failed to decode listing from {url}: {source}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The configured endpoint cannot be turned into a request URL.
    #[error("invalid storage endpoint {0}")]
    Url(String),
    /// Writing a downloaded object to disk failed.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// Destination file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Ambient credentials were found but unusable.
    #[error("credential lookup failed: {0}")]
    Auth(String),
}

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No bucket configured.
    #[error("bucket name must not be empty")]
    EmptyBucket,
    /// Entrypoint is not a plain relative file path.
    #[error("entrypoint {0:?} must be a relative path inside the version directory")]
    InvalidEntrypoint(String),
    /// The flat layout writes straight into the active directory.
    #[error("activation {0} cannot be combined with the flat layout")]
    ActivationWithFlatLayout(&'static str),
}

/// Failures of a sync run. Every variant aborts the run; nothing is retried.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration rejected before any remote call.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Game id or version unusable as a path segment.
    #[error("invalid {kind} {value:?}: {reason}")]
    InvalidTarget {
        /// Which component was rejected.
        kind: &'static str,
        /// Rejected value.
        value: String,
        /// Human readable reason.
        reason: &'static str,
    },
    /// Listing or downloading from the bucket failed.
    #[error("remote storage error: {0}")]
    Remote(StorageError),
    /// Local filesystem operation failed.
    #[error("failed to {action} {}: {source}", path.display())]
    Filesystem {
        /// What was being attempted.
        action: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The synced version lacks the entrypoint the build needs.
    #[error("entrypoint {} is missing from the synced version", path.display())]
    MissingEntrypoint {
        /// Expected location of the entrypoint.
        path: PathBuf,
    },
    /// The synced version ships an entry that mirroring would copy onto the
    /// `versions/` archive holding the version itself.
    #[error("synced version contains reserved entry {}", path.display())]
    ReservedEntry {
        /// Offending path inside the version directory.
        path: PathBuf,
    },
    /// A listed object would be written outside the destination root.
    #[error("refusing to sync object {name:?}: it escapes the destination root")]
    UnsafeObjectName {
        /// Offending object name.
        name: String,
    },
}

impl SyncError {
    pub(crate) fn fs(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }
}

impl From<StorageError> for SyncError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io { path, source } => Self::Filesystem {
                action: "write",
                path,
                source,
            },
            other => Self::Remote(other),
        }
    }
}
