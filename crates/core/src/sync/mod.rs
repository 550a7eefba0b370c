//! Download a game version from the bucket into the build directory.

/// Local filesystem helpers used around the download.
pub mod local;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{
    config::{Activation, SyncConfig},
    error::SyncError,
    layout,
    models::{SyncReport, SyncTarget},
    storage::ObjectStore,
};

/// Synchronises one `(game, version)` pair per [`AssetSync::run`] call.
///
/// Runs are strictly sequential and destructive: the destination is cleared
/// before anything is listed, and a failed run leaves it truncated.
/// Concurrent runs against the same build directory must be serialised by
/// the caller.
pub struct AssetSync<S> {
    config: SyncConfig,
    store: S,
}

impl<S: ObjectStore> AssetSync<S> {
    /// Create a synchroniser from validated configuration and a store.
    pub fn new(config: SyncConfig, store: S) -> Result<Self, SyncError> {
        config.validate()?;
        Ok(Self { config, store })
    }

    /// Configuration in use.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Directory objects of `target` are written into.
    pub fn destination_root(&self, target: &SyncTarget) -> PathBuf {
        layout::destination_root(&self.config.build_dir, self.config.layout, target)
    }

    /// Directory the build serves `target`'s game from.
    pub fn game_root(&self, target: &SyncTarget) -> PathBuf {
        layout::game_root(&self.config.build_dir, target)
    }

    /// Replace the local tree of `target` with the bucket's content and run
    /// the configured activation step.
    pub async fn run(&self, target: &SyncTarget) -> Result<SyncReport, SyncError> {
        let prefix = target.remote_prefix();
        let root = self.destination_root(target);
        info!(
            game = %target.game,
            version = %target.version,
            bucket = %self.config.bucket,
            root = %root.display(),
            "syncing game assets"
        );

        local::reset_dir(&root).await?;

        let objects = self.store.list(&prefix).await?;
        debug!(prefix = %prefix, count = objects.len(), "listed remote objects");

        let mut files = 0usize;
        let mut bytes = 0u64;
        let mut skipped = 0usize;
        for object in objects {
            let Some(relative) = layout::relative_path(&prefix, &object.name)? else {
                debug!(name = %object.name, "skipping placeholder object");
                skipped += 1;
                continue;
            };

            let dest = root.join(&relative);
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|err| SyncError::fs("create directory", parent, err))?;
            }

            let written = self.store.download(&object.name, &dest).await?;
            debug!(name = %object.name, bytes = written, "downloaded object");
            files += 1;
            bytes += written;
        }
        info!(files, bytes, "downloaded {files} files into {}", root.display());

        let activated = self.activate(&root, target).await?;

        Ok(SyncReport {
            target: target.clone(),
            root,
            files,
            bytes,
            skipped,
            activated,
        })
    }

    async fn activate(
        &self,
        root: &Path,
        target: &SyncTarget,
    ) -> Result<Option<PathBuf>, SyncError> {
        let game_root = self.game_root(target);
        match self.config.activation {
            Activation::None => return Ok(None),
            Activation::Entrypoint => {
                local::copy_entrypoint(root, &game_root, &self.config.entrypoint).await?
            }
            Activation::Mirror => local::mirror(root, &game_root).await?,
        }
        info!(
            activation = self.config.activation.as_str(),
            game_root = %game_root.display(),
            "activated synced version"
        );
        Ok(Some(game_root))
    }
}
