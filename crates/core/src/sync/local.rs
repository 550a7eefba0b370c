//! Filesystem side of a sync run: clearing destinations and deriving the
//! active game directory.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::debug;
use walkdir::WalkDir;

use crate::{error::SyncError, layout::VERSIONS_DIR};

/// Remove `path` recursively if present and recreate it empty.
pub async fn reset_dir(path: &Path) -> Result<(), SyncError> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => debug!(path = %path.display(), "removed existing directory"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(SyncError::fs("remove", path, err)),
    }
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|err| SyncError::fs("create directory", path, err))
}

/// Copy the entrypoint of `version_root` into `game_root`.
///
/// Nothing is touched when the entrypoint is missing.
pub async fn copy_entrypoint(
    version_root: &Path,
    game_root: &Path,
    entrypoint: &str,
) -> Result<(), SyncError> {
    let source = version_root.join(entrypoint);
    let is_file = tokio::fs::metadata(&source)
        .await
        .map(|metadata| metadata.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(SyncError::MissingEntrypoint { path: source });
    }

    let dest = game_root.join(entrypoint);
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| SyncError::fs("create directory", parent, err))?;
    }
    tokio::fs::copy(&source, &dest)
        .await
        .map_err(|err| SyncError::fs("copy", &source, err))?;
    debug!(from = %source.display(), to = %dest.display(), "copied entrypoint");
    Ok(())
}

/// Make `game_root` an exact copy of `version_root`, keeping only the
/// `versions/` archive that holds the source tree.
///
/// A version with its own top-level `versions` entry is rejected before
/// anything is removed: copying it would write into the archive being read.
pub async fn mirror(version_root: &Path, game_root: &Path) -> Result<(), SyncError> {
    let reserved = version_root.join(VERSIONS_DIR);
    if tokio::fs::symlink_metadata(&reserved).await.is_ok() {
        return Err(SyncError::ReservedEntry { path: reserved });
    }

    let source = version_root.to_path_buf();
    let dest = game_root.to_path_buf();
    tokio::task::spawn_blocking(move || mirror_tree(&source, &dest))
        .await
        .map_err(|err| SyncError::fs("mirror into", game_root, io::Error::other(err)))?
}

fn mirror_tree(version_root: &Path, game_root: &Path) -> Result<(), SyncError> {
    clear_except_versions(game_root)?;
    copy_tree(version_root, game_root)
}

fn clear_except_versions(game_root: &Path) -> Result<(), SyncError> {
    let entries = match fs::read_dir(game_root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return fs::create_dir_all(game_root)
                .map_err(|err| SyncError::fs("create directory", game_root, err));
        }
        Err(err) => return Err(SyncError::fs("read", game_root, err)),
    };

    for entry in entries {
        let entry = entry.map_err(|err| SyncError::fs("read", game_root, err))?;
        if entry.file_name() == VERSIONS_DIR {
            continue;
        }

        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|err| SyncError::fs("inspect", &path, err))?;
        let removed = if file_type.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|err| SyncError::fs("remove", &path, err))?;
    }
    Ok(())
}

fn copy_tree(source: &Path, dest: &Path) -> Result<(), SyncError> {
    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            let path = err.path().map_or_else(|| source.to_path_buf(), PathBuf::from);
            SyncError::fs("walk", path, io::Error::from(err))
        })?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .map_err(|err| SyncError::fs("create directory", &target, err))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)
                .map_err(|err| SyncError::fs("copy", entry.path(), err))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[tokio::test]
    async fn reset_creates_missing_directory() -> Result<()> {
        let dir = tempdir()?;
        let root = dir.path().join("a/b/c");
        reset_dir(&root).await?;
        assert!(root.is_dir());
        assert_eq!(fs::read_dir(&root)?.count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn reset_empties_existing_directory() -> Result<()> {
        let dir = tempdir()?;
        fs::create_dir_all(dir.path().join("nested/deeper"))?;
        fs::write(dir.path().join("nested/deeper/file.txt"), "x")?;
        fs::write(dir.path().join("top.txt"), "y")?;
        reset_dir(dir.path()).await?;
        assert_eq!(fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn mirror_keeps_the_versions_archive() -> Result<()> {
        let dir = tempdir()?;
        let game_root = dir.path().join("games/quiz");
        let version_root = game_root.join("versions/2");
        fs::create_dir_all(version_root.join("js"))?;
        fs::write(version_root.join("index.html"), "v2")?;
        fs::write(version_root.join("js/app.js"), "app")?;
        fs::create_dir_all(game_root.join("css"))?;
        fs::write(game_root.join("css/old.css"), "old")?;
        fs::write(game_root.join("index.html"), "v1")?;

        mirror(&version_root, &game_root).await?;

        assert_eq!(fs::read_to_string(game_root.join("index.html"))?, "v2");
        assert_eq!(fs::read_to_string(game_root.join("js/app.js"))?, "app");
        assert!(!game_root.join("css").exists());
        assert!(version_root.join("index.html").is_file());
        Ok(())
    }

    #[tokio::test]
    async fn mirror_refuses_a_version_shipping_its_own_archive() -> Result<()> {
        let dir = tempdir()?;
        let game_root = dir.path().join("games/quiz");
        let version_root = game_root.join("versions/2");
        fs::create_dir_all(version_root.join("versions/2"))?;
        fs::write(version_root.join("versions/2/index.html"), "nested")?;
        fs::write(version_root.join("index.html"), "v2")?;
        fs::write(game_root.join("index.html"), "v1")?;

        let err = mirror(&version_root, &game_root).await.unwrap_err();

        match err {
            SyncError::ReservedEntry { path } => assert_eq!(path, version_root.join("versions")),
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(fs::read_to_string(game_root.join("index.html"))?, "v1");
        assert_eq!(
            fs::read_to_string(version_root.join("versions/2/index.html"))?,
            "nested"
        );
        Ok(())
    }
}
