#![warn(clippy::all, missing_docs)]

//! Core of the `sync_games` CI helper.
//!
//! Downloads a versioned set of game assets from a Cloud Storage bucket into
//! the local build directory and optionally derives the game's active
//! directory from it.

pub mod config;
pub mod error;
pub mod layout;
pub mod models;
pub mod storage;
pub mod sync;

pub use crate::config::{Activation, Layout, SyncConfig};
pub use error::{ConfigError, StorageError, SyncError};
pub use models::{GameId, RemoteObject, SyncReport, SyncTarget, Version};
pub use storage::{Credentials, GcsClient, ObjectStore};
pub use sync::AssetSync;
