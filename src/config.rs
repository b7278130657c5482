//! Environment-driven configuration.
//!
//! All knobs come from the environment (with `.env` support for local
//! dev). The registry token is only ever read from the environment; it is
//! never embedded in code or logged.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the release registry API, e.g.
    /// `https://api.github.com/repos/acme/olist-marts`.
    pub registry_url: String,
    /// Bearer token for private registries. Optional for public ones.
    pub registry_token: Option<String>,
    /// Release tag to pin, or `latest`.
    pub tag: String,
    /// Name of the dataset asset inside the release.
    pub asset_name: String,
    /// Directory holding local artifact copies.
    pub cache_dir: PathBuf,
    /// Network timeout for registry and download calls, in seconds.
    pub timeout_s: u64,
    /// Skip the cache-hit fast path and always re-download.
    pub force_refresh: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let registry_url = std::env::var("REGISTRY_URL")
            .map_err(|_| anyhow::anyhow!("REGISTRY_URL must be set (release registry API base)"))?;

        let registry_token = std::env::var("REGISTRY_TOKEN").ok().filter(|t| !t.is_empty());

        let tag = std::env::var("ARTIFACT_TAG").unwrap_or_else(|_| "latest".to_string());

        let asset_name =
            std::env::var("ARTIFACT_ASSET").unwrap_or_else(|_| "olist.sqlite".to_string());

        let cache_dir = std::env::var("CACHE_DIR")
            .unwrap_or_else(|_| "./artifacts".to_string())
            .into();

        let timeout_s = std::env::var("FETCH_TIMEOUT_S")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .unwrap_or(300);

        let force_refresh = std::env::var("FORCE_REFRESH")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            registry_url,
            registry_token,
            tag,
            asset_name,
            cache_dir,
            timeout_s,
            force_refresh,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests mutate process state; keep them in one test to avoid
    // interference under the parallel test runner.
    #[test]
    fn from_env_defaults_and_overrides() {
        std::env::set_var("REGISTRY_URL", "https://registry.example/repos/acme/marts");
        std::env::remove_var("REGISTRY_TOKEN");
        std::env::remove_var("ARTIFACT_TAG");
        std::env::remove_var("ARTIFACT_ASSET");
        std::env::remove_var("CACHE_DIR");
        std::env::remove_var("FETCH_TIMEOUT_S");
        std::env::set_var("FORCE_REFRESH", "true");

        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.registry_url, "https://registry.example/repos/acme/marts");
        assert_eq!(cfg.tag, "latest");
        assert_eq!(cfg.asset_name, "olist.sqlite");
        assert_eq!(cfg.cache_dir, PathBuf::from("./artifacts"));
        assert_eq!(cfg.timeout_s, 300);
        assert!(cfg.force_refresh);
        assert!(cfg.registry_token.is_none());
    }
}
