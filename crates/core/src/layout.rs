//! Mapping between remote object names and local build paths.

use std::path::{Component, Path, PathBuf};

use crate::{config::Layout, error::SyncError, models::SyncTarget};

/// Name of the archive directory under the game root.
pub const VERSIONS_DIR: &str = "versions";

/// Directory the running build serves the game from.
pub fn game_root(build_dir: &Path, target: &SyncTarget) -> PathBuf {
    build_dir.join("games").join(target.game.as_str())
}

/// Directory the objects of `target` are downloaded into.
pub fn destination_root(build_dir: &Path, layout: Layout, target: &SyncTarget) -> PathBuf {
    let game_root = game_root(build_dir, target);
    match layout {
        Layout::Versioned => game_root
            .join(VERSIONS_DIR)
            .join(target.version.as_str()),
        Layout::Flat => game_root,
    }
}

/// Local relative path for `name`, or `None` for placeholder objects.
///
/// The bare prefix and names ending in `/` are folder markers created by
/// console uploads and carry no file content.
pub fn relative_path(prefix: &str, name: &str) -> Result<Option<PathBuf>, SyncError> {
    let unsafe_name = || SyncError::UnsafeObjectName {
        name: name.to_string(),
    };

    let rest = name.strip_prefix(prefix).ok_or_else(unsafe_name)?;
    if rest.is_empty() || rest.ends_with('/') {
        return Ok(None);
    }

    let relative = Path::new(rest);
    let mut clean = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_name())
            }
        }
    }

    if clean.as_os_str().is_empty() {
        return Ok(None);
    }
    Ok(Some(clean))
}
