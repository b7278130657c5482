//! Release registry client.
//!
//! Resolves a version tag to a concrete dataset asset using a
//! GitHub-releases-style API: look up the release for a tag (or `latest`),
//! enumerate its assets, and pick the configured one. Read-only; a single
//! lookup round trip per resolve.

use crate::error::ResolveError;
use crate::models::ArtifactReference;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ReleaseDoc {
    tag_name: String,
    #[serde(default)]
    assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Deserialize)]
struct ReleaseAsset {
    name: String,
    #[serde(default)]
    size: Option<u64>,
    browser_download_url: String,
}

#[derive(Clone)]
pub struct RegistryClient {
    client: Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        if let Some(token) = token {
            let mut auth: reqwest::header::HeaderValue = format!("Bearer {}", token)
                .parse()
                .context("Invalid registry token")?;
            auth.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, auth);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("Failed to build registry client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve `tag` to the release asset named `asset_name`.
    ///
    /// The returned reference carries the concrete tag reported by the
    /// registry, so `latest` resolves to something pinnable.
    pub async fn resolve(
        &self,
        tag: &str,
        asset_name: &str,
    ) -> Result<ArtifactReference, ResolveError> {
        if tag.is_empty() {
            return Err(ResolveError::EmptyTag);
        }

        let url = release_url(&self.base_url, tag);
        debug!("Resolving release: {}", url);

        let resp = self.client.get(&url).send().await?;
        check_release_status(resp.status(), tag)?;
        let release: ReleaseDoc = resp.error_for_status()?.json().await?;

        find_asset(&release, tag, asset_name)
    }
}

/// An unknown tag surfaces as a registry 404; everything else falls
/// through to the generic transport handling.
fn check_release_status(status: reqwest::StatusCode, tag: &str) -> Result<(), ResolveError> {
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ResolveError::ReleaseNotFound {
            tag: tag.to_string(),
        });
    }
    Ok(())
}

fn release_url(base: &str, tag: &str) -> String {
    if tag.eq_ignore_ascii_case("latest") {
        format!("{}/releases/latest", base)
    } else {
        format!("{}/releases/tags/{}", base, tag)
    }
}

fn find_asset(
    release: &ReleaseDoc,
    requested_tag: &str,
    asset_name: &str,
) -> Result<ArtifactReference, ResolveError> {
    let asset = release
        .assets
        .iter()
        .find(|a| a.name == asset_name)
        .ok_or_else(|| ResolveError::AssetMissing {
            tag: requested_tag.to_string(),
            asset: asset_name.to_string(),
        })?;

    Ok(ArtifactReference {
        tag: release.tag_name.clone(),
        asset_name: asset.name.clone(),
        download_url: asset.browser_download_url.clone(),
        size: asset.size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release_fixture() -> ReleaseDoc {
        serde_json::from_str(
            r#"{
                "tag_name": "v2026.08.1",
                "assets": [
                    {"name": "olist.sqlite", "size": 5242880,
                     "browser_download_url": "https://registry.example/dl/olist.sqlite"},
                    {"name": "manifest.json", "size": 812,
                     "browser_download_url": "https://registry.example/dl/manifest.json"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn release_url_pins_tags_and_aliases_latest() {
        assert_eq!(
            release_url("https://api.example/repos/acme/marts", "v1.2.0"),
            "https://api.example/repos/acme/marts/releases/tags/v1.2.0"
        );
        assert_eq!(
            release_url("https://api.example/repos/acme/marts", "latest"),
            "https://api.example/repos/acme/marts/releases/latest"
        );
    }

    #[test]
    fn find_asset_returns_reference_with_resolved_tag() {
        let release = release_fixture();
        let r = find_asset(&release, "latest", "olist.sqlite").unwrap();
        assert_eq!(r.tag, "v2026.08.1");
        assert_eq!(r.asset_name, "olist.sqlite");
        assert_eq!(r.size, Some(5_242_880));
        assert_eq!(r.download_url, "https://registry.example/dl/olist.sqlite");
    }

    #[test]
    fn unknown_tag_maps_to_release_not_found() {
        let err = check_release_status(reqwest::StatusCode::NOT_FOUND, "v9.9.9").unwrap_err();
        match err {
            ResolveError::ReleaseNotFound { tag } => assert_eq!(tag, "v9.9.9"),
            other => panic!("expected ReleaseNotFound, got {:?}", other),
        }
    }

    #[test]
    fn existing_release_passes_the_status_check() {
        assert!(check_release_status(reqwest::StatusCode::OK, "v1.0.0").is_ok());
        // Non-404 failures are left to the transport error path.
        assert!(check_release_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "v1.0.0").is_ok());
    }

    #[test]
    fn find_asset_reports_missing_asset_with_context() {
        let release = release_fixture();
        let err = find_asset(&release, "v2026.08.1", "olist.duckdb").unwrap_err();
        match err {
            ResolveError::AssetMissing { tag, asset } => {
                assert_eq!(tag, "v2026.08.1");
                assert_eq!(asset, "olist.duckdb");
            }
            other => panic!("expected AssetMissing, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn resolve_rejects_empty_tag_without_network() {
        let client = RegistryClient::new(
            "https://api.example/repos/acme/marts",
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        let err = client.resolve("", "olist.sqlite").await.unwrap_err();
        assert!(matches!(err, ResolveError::EmptyTag));
    }
}
