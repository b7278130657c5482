//! Error types for artifact resolution, acquisition, and dataset access.
//!
//! Resolution and acquisition failures always carry enough context (tag,
//! asset name, underlying cause) to diagnose from a log line. Analytical
//! edge cases (missing history, absent spend table) are deliberately NOT
//! errors and never appear here.

use std::path::PathBuf;

/// Errors from resolving a tag against the release registry.
#[derive(Debug)]
pub enum ResolveError {
    /// The tag parameter was empty.
    EmptyTag,
    /// No release exists for the requested tag.
    ReleaseNotFound { tag: String },
    /// The release exists but does not carry the expected asset.
    AssetMissing { tag: String, asset: String },
    /// Transport-level failure talking to the registry. Transient; the
    /// caller may retry with backoff.
    Network(reqwest::Error),
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTag => write!(f, "release tag must not be empty"),
            Self::ReleaseNotFound { tag } => write!(f, "no release found for tag '{}'", tag),
            Self::AssetMissing { tag, asset } => {
                write!(f, "release '{}' has no asset named '{}'", tag, asset)
            }
            Self::Network(e) => write!(f, "registry request failed: {}", e),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Network(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ResolveError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e)
    }
}

/// Errors from ensuring a local artifact copy.
#[derive(Debug)]
pub enum AcquireError {
    /// Transport failure mid-download. Transient; safe to retry.
    Network(reqwest::Error),
    /// The download exceeded the configured timeout. Transient.
    Timeout(reqwest::Error),
    /// The downloaded temp file did not match the expected size. The temp
    /// file has been discarded; nothing was promoted to the canonical path.
    Incomplete {
        asset: String,
        expected: u64,
        actual: u64,
    },
    /// Filesystem failure. Fatal for this invocation.
    Disk(std::io::Error),
}

impl std::fmt::Display for AcquireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(e) => write!(f, "artifact download failed: {}", e),
            Self::Timeout(e) => write!(f, "artifact download timed out: {}", e),
            Self::Incomplete {
                asset,
                expected,
                actual,
            } => write!(
                f,
                "incomplete download of '{}': expected {} bytes, got {}",
                asset, expected, actual
            ),
            Self::Disk(e) => write!(f, "disk error while acquiring artifact: {}", e),
        }
    }
}

impl std::error::Error for AcquireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Network(e) | Self::Timeout(e) => Some(e),
            Self::Disk(e) => Some(e),
            Self::Incomplete { .. } => None,
        }
    }
}

impl From<reqwest::Error> for AcquireError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e)
        } else {
            Self::Network(e)
        }
    }
}

impl From<std::io::Error> for AcquireError {
    fn from(e: std::io::Error) -> Self {
        Self::Disk(e)
    }
}

/// Errors from opening or querying the local dataset.
#[derive(Debug)]
pub enum DatasetError {
    Sqlite(rusqlite::Error),
    /// The artifact path vanished or could not be opened read-only.
    Open { path: PathBuf, cause: rusqlite::Error },
    /// A row violated the snapshot schema (e.g. an unparseable date).
    Malformed { detail: String },
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(e) => write!(f, "dataset query failed: {}", e),
            Self::Open { path, cause } => {
                write!(f, "failed to open dataset at {}: {}", path.display(), cause)
            }
            Self::Malformed { detail } => write!(f, "malformed dataset row: {}", detail),
        }
    }
}

impl std::error::Error for DatasetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlite(e) => Some(e),
            Self::Open { cause, .. } => Some(cause),
            Self::Malformed { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DatasetError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e)
    }
}
