//! Domain models shared by the synchroniser and its storage backends.

use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Identifier namespacing a game's remote and local paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GameId(String);

/// Identifier of a specific asset build of a game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Version(String);

impl GameId {
    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Version {
    /// Borrow the raw version string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The `(game, version)` pair a single sync run operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTarget")]
pub struct SyncTarget {
    /// Game whose assets are synchronised.
    pub game: GameId,
    /// Asset build to download.
    pub version: Version,
}

impl SyncTarget {
    /// Validate both components and build a target.
    ///
    /// Each component ends up as a single path segment both remotely and on
    /// disk, so separators and dot segments are refused.
    pub fn new(game: impl Into<String>, version: impl Into<String>) -> Result<Self, SyncError> {
        let game = game.into();
        let version = version.into();
        check_segment("game id", &game)?;
        check_segment("version", &version)?;
        Ok(Self {
            game: GameId(game),
            version: Version(version),
        })
    }

    /// Remote prefix every object of this version lives under.
    pub fn remote_prefix(&self) -> String {
        format!("games/{}/versions/{}/", self.game, self.version)
    }
}

#[derive(Deserialize)]
struct RawTarget {
    game: String,
    version: String,
}

impl TryFrom<RawTarget> for SyncTarget {
    type Error = SyncError;

    fn try_from(raw: RawTarget) -> Result<Self, Self::Error> {
        Self::new(raw.game, raw.version)
    }
}

impl fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.game, self.version)
    }
}

fn check_segment(kind: &'static str, value: &str) -> Result<(), SyncError> {
    let reason = if value.is_empty() {
        Some("must not be empty")
    } else if value.contains(|c: char| c == '/' || c == '\\') {
        Some("must not contain path separators")
    } else if value == "." || value == ".." {
        Some("must not be a dot segment")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(SyncError::InvalidTarget {
            kind,
            value: value.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// A blob listed under a remote prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    /// Full object name inside the bucket.
    pub name: String,
    /// Size in bytes when the listing reports it.
    pub size: Option<u64>,
}

/// Outcome of a successful sync run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    /// What was synchronised.
    pub target: SyncTarget,
    /// Local directory the objects were written into.
    pub root: PathBuf,
    /// Number of files written.
    pub files: usize,
    /// Total bytes written.
    pub bytes: u64,
    /// Placeholder objects that were listed but not written.
    pub skipped: usize,
    /// Active directory updated after the download, if any.
    pub activated: Option<PathBuf>,
}
