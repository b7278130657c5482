//! Artifact acquisition: download-once, cache-forever (per tag).
//!
//! The fetcher guarantees that a file sitting at the canonical cache path
//! is always a *complete* download: bytes stream into a `.part` sibling
//! first and only an `fs::rename` publishes them. The cache-hit fast path
//! is an existence check with a size floor, not a checksum: a complete
//! but corrupted file is not detected. That matches the upstream
//! publishing discipline (artifacts are immutable per tag) and keeps
//! startup free of redundant network work.

use crate::error::AcquireError;
use crate::models::{ArtifactReference, LocalArtifact};
use chrono::Utc;
use parking_lot::Mutex;
use reqwest::Client;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Anything at or below this is a stub (error page, truncated write from a
/// crashed process without the atomic rename), never a real dataset.
const MIN_ARTIFACT_BYTES: u64 = 1024;

pub struct Fetcher {
    client: Client,
    /// One lock per canonical path so racing callers never run two
    /// downloads against the same target.
    inflight: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
    force_refresh: bool,
}

impl Fetcher {
    pub fn new(timeout: Duration, force_refresh: bool) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build download client: {}", e))?;
        Ok(Self {
            client,
            inflight: Mutex::new(HashMap::new()),
            force_refresh,
        })
    }

    /// Ensure a complete local copy of `reference` exists under `dir`.
    ///
    /// Idempotent: a second call with no external change is a cache hit and
    /// performs no network I/O.
    pub async fn ensure_local(
        &self,
        reference: &ArtifactReference,
        dir: &Path,
    ) -> Result<LocalArtifact, AcquireError> {
        let path = dir.join(&reference.asset_name);

        let gate = self.path_gate(&path);
        let _guard = gate.lock().await;

        if !self.force_refresh {
            if let Some(size) = cached_copy(&path) {
                debug!("Using cached artifact: {} ({} bytes)", path.display(), size);
                return Ok(LocalArtifact {
                    path,
                    size,
                    tag: reference.tag.clone(),
                    acquired_at: Utc::now(),
                });
            }
        }

        tokio::fs::create_dir_all(dir).await?;
        let tmp = part_path(&path);

        info!(
            "Downloading artifact '{}' (tag {}) to {}",
            reference.asset_name,
            reference.tag,
            path.display()
        );
        let written = self.download_to(&reference.download_url, &tmp).await?;
        let size = promote(&tmp, &path, &reference.asset_name, reference.size, written)?;

        info!("Artifact ready: {} ({} bytes)", path.display(), size);
        Ok(LocalArtifact {
            path,
            size,
            tag: reference.tag.clone(),
            acquired_at: Utc::now(),
        })
    }

    fn path_gate(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inflight.lock();
        map.entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Stream the asset into `tmp`. Any failure (transport, truncated
    /// stream, disk) discards the temp file so nothing can mistake it for
    /// a finished download.
    async fn download_to(&self, url: &str, tmp: &Path) -> Result<u64, AcquireError> {
        let result = self.stream_to_file(url, tmp).await;
        if result.is_err() {
            discard_temp(tmp);
        }
        result
    }

    async fn stream_to_file(&self, url: &str, tmp: &Path) -> Result<u64, AcquireError> {
        let mut resp = self.client.get(url).send().await?.error_for_status()?;

        let mut file = tokio::fs::File::create(tmp).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = resp.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

/// Cache-hit fast path: the canonical file exists and clears the size
/// floor. No checksum comparison against the registry record.
fn cached_copy(path: &Path) -> Option<u64> {
    let meta = std::fs::metadata(path).ok()?;
    if meta.is_file() && meta.len() > MIN_ARTIFACT_BYTES {
        Some(meta.len())
    } else {
        None
    }
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

/// Validate the finished temp file and atomically publish it.
///
/// On any mismatch the temp file is discarded and the canonical path is
/// left untouched, so a consumer can never observe a partial artifact.
fn promote(
    tmp: &Path,
    path: &Path,
    asset: &str,
    expected: Option<u64>,
    written: u64,
) -> Result<u64, AcquireError> {
    if let Some(expected) = expected {
        if written != expected {
            discard_temp(tmp);
            return Err(AcquireError::Incomplete {
                asset: asset.to_string(),
                expected,
                actual: written,
            });
        }
    }
    if written <= MIN_ARTIFACT_BYTES {
        discard_temp(tmp);
        return Err(AcquireError::Incomplete {
            asset: asset.to_string(),
            expected: expected.unwrap_or(MIN_ARTIFACT_BYTES + 1),
            actual: written,
        });
    }

    std::fs::rename(tmp, path)?;
    Ok(written)
}

fn discard_temp(tmp: &Path) {
    match std::fs::remove_file(tmp) {
        Ok(()) => {}
        // Nothing was written yet (e.g. the request itself failed).
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove temp download {}: {}", tmp.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArtifactReference;
    use tempfile::TempDir;

    fn reference(asset: &str) -> ArtifactReference {
        ArtifactReference {
            tag: "v1.0.0".to_string(),
            asset_name: asset.to_string(),
            // Unroutable: any test reaching the network fails fast.
            download_url: "http://127.0.0.1:9/never".to_string(),
            size: None,
        }
    }

    fn seed_artifact(dir: &Path, name: &str, bytes: usize) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, vec![0xAB; bytes]).unwrap();
        path
    }

    #[tokio::test]
    async fn cache_hit_skips_network_entirely() {
        let dir = TempDir::new().unwrap();
        let path = seed_artifact(dir.path(), "olist.sqlite", 4096);

        let fetcher = Fetcher::new(Duration::from_millis(200), false).unwrap();
        let artifact = fetcher
            .ensure_local(&reference("olist.sqlite"), dir.path())
            .await
            .unwrap();

        assert_eq!(artifact.path, path);
        assert_eq!(artifact.size, 4096);
        assert_eq!(artifact.tag, "v1.0.0");
    }

    #[tokio::test]
    async fn ensure_local_is_idempotent() {
        let dir = TempDir::new().unwrap();
        seed_artifact(dir.path(), "olist.sqlite", 4096);

        let fetcher = Fetcher::new(Duration::from_millis(200), false).unwrap();
        let first = fetcher
            .ensure_local(&reference("olist.sqlite"), dir.path())
            .await
            .unwrap();
        let second = fetcher
            .ensure_local(&reference("olist.sqlite"), dir.path())
            .await
            .unwrap();

        assert_eq!(first.path, second.path);
        assert_eq!(first.size, second.size);
    }

    #[tokio::test]
    async fn force_refresh_bypasses_the_cached_copy() {
        let dir = TempDir::new().unwrap();
        let path = seed_artifact(dir.path(), "olist.sqlite", 4096);

        let fetcher = Fetcher::new(Duration::from_millis(200), true).unwrap();
        let err = fetcher
            .ensure_local(&reference("olist.sqlite"), dir.path())
            .await
            .unwrap_err();
        // The unroutable URL was contacted, so the fast path was skipped.
        assert!(matches!(
            err,
            AcquireError::Network(_) | AcquireError::Timeout(_)
        ));
        // The failed refresh never clobbered the existing artifact.
        assert!(path.exists());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 4096);
    }

    #[tokio::test]
    async fn failed_download_leaves_no_temp_file_behind() {
        let dir = TempDir::new().unwrap();
        let canonical = dir.path().join("olist.sqlite");
        // Stale leftover from an earlier crashed attempt.
        let tmp = part_path(&canonical);
        std::fs::write(&tmp, vec![0u8; 256]).unwrap();

        let fetcher = Fetcher::new(Duration::from_millis(200), false).unwrap();
        let err = fetcher
            .ensure_local(&reference("olist.sqlite"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AcquireError::Network(_) | AcquireError::Timeout(_)
        ));
        // Every error exit discards the temp file; the canonical path was
        // never created.
        assert!(!tmp.exists());
        assert!(!canonical.exists());
    }

    #[test]
    fn stub_files_are_not_cache_hits() {
        let dir = TempDir::new().unwrap();
        let path = seed_artifact(dir.path(), "olist.sqlite", 10);
        assert!(cached_copy(&path).is_none());

        let real = seed_artifact(dir.path(), "real.sqlite", 2048);
        assert_eq!(cached_copy(&real), Some(2048));
    }

    #[test]
    fn short_download_is_discarded_and_never_promoted() {
        let dir = TempDir::new().unwrap();
        let canonical = dir.path().join("olist.sqlite");
        let tmp = part_path(&canonical);
        std::fs::write(&tmp, vec![0u8; 512]).unwrap();

        let err = promote(&tmp, &canonical, "olist.sqlite", Some(4096), 512).unwrap_err();
        assert!(matches!(
            err,
            AcquireError::Incomplete {
                expected: 4096,
                actual: 512,
                ..
            }
        ));
        assert!(!canonical.exists());
        assert!(!tmp.exists());
    }

    #[test]
    fn complete_download_is_promoted_atomically() {
        let dir = TempDir::new().unwrap();
        let canonical = dir.path().join("olist.sqlite");
        let tmp = part_path(&canonical);
        std::fs::write(&tmp, vec![0u8; 4096]).unwrap();

        let size = promote(&tmp, &canonical, "olist.sqlite", Some(4096), 4096).unwrap();
        assert_eq!(size, 4096);
        assert!(canonical.exists());
        assert!(!tmp.exists());
    }

    #[tokio::test]
    async fn interrupted_download_can_be_retried_from_scratch() {
        let dir = TempDir::new().unwrap();
        let canonical = dir.path().join("olist.sqlite");
        let tmp = part_path(&canonical);

        // First attempt: truncated.
        std::fs::write(&tmp, vec![0u8; 100]).unwrap();
        assert!(promote(&tmp, &canonical, "olist.sqlite", Some(4096), 100).is_err());
        assert!(!canonical.exists());

        // Retry: full download succeeds and publishes.
        std::fs::write(&tmp, vec![0u8; 4096]).unwrap();
        promote(&tmp, &canonical, "olist.sqlite", Some(4096), 4096).unwrap();
        assert!(canonical.exists());
    }
}
