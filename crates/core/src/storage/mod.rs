//! Read-only access to the remote object store.

/// Ambient credential discovery.
pub mod auth;
/// Google Cloud Storage JSON API client.
pub mod gcs;
#[cfg(test)]
pub(crate) mod testing;

use std::path::Path;

use crate::{error::StorageError, models::RemoteObject};

pub use auth::Credentials;
pub use gcs::GcsClient;

/// Minimal surface the synchroniser needs from a bucket.
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    /// Every object whose name starts with `prefix`, in listing order.
    async fn list(&self, prefix: &str) -> Result<Vec<RemoteObject>, StorageError>;

    /// Write the content of `name` to `dest`, replacing any existing file.
    /// Returns the number of bytes written.
    async fn download(&self, name: &str, dest: &Path) -> Result<u64, StorageError>;
}
