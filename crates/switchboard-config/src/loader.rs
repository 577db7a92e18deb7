use std::collections::HashSet;
use std::path::Path;

use url::Url;

use crate::Config;
use crate::upstream::DEFAULT_BASE_URL;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a placeholder cannot be
    /// resolved, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if placeholder expansion, parsing or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error describing the first inconsistency found
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_pools()?;
        self.validate_queue()?;
        self.validate_health()?;
        self.validate_upstream()?;
        Ok(())
    }

    fn validate_pools(&self) -> anyhow::Result<()> {
        if self.pools.general.is_empty() {
            anyhow::bail!("pools.general must contain at least one backend (it is the fallback pool)");
        }

        for (category, backends) in self.pools.iter() {
            let mut seen = HashSet::new();

            for backend in backends {
                if backend.id.trim().is_empty() {
                    anyhow::bail!("pools.{category} contains a backend with an empty id");
                }
                if !seen.insert(backend.id.as_str()) {
                    anyhow::bail!("pools.{category} lists backend '{}' more than once", backend.id);
                }
                if backend.priority == 0 {
                    anyhow::bail!("pools.{category}: backend '{}' must have priority >= 1", backend.id);
                }
                if !(0.0..=2.0).contains(&backend.temperature) {
                    anyhow::bail!(
                        "pools.{category}: backend '{}' temperature {} is outside 0.0..=2.0",
                        backend.id,
                        backend.temperature
                    );
                }
            }
        }

        Ok(())
    }

    fn validate_queue(&self) -> anyhow::Result<()> {
        let concurrency = self.queue.max_concurrency();

        if concurrency == 0 {
            anyhow::bail!("queue.max_concurrency must be greater than 0");
        }

        if self.upstream.pool_max_idle_per_host < concurrency {
            anyhow::bail!(
                "upstream.pool_max_idle_per_host ({}) must be at least queue.max_concurrency ({concurrency})",
                self.upstream.pool_max_idle_per_host
            );
        }

        Ok(())
    }

    fn validate_health(&self) -> anyhow::Result<()> {
        if self.health.failure_threshold == 0 {
            anyhow::bail!("health.failure_threshold must be greater than 0");
        }

        Ok(())
    }

    fn validate_upstream(&self) -> anyhow::Result<()> {
        let default_host = Url::parse(DEFAULT_BASE_URL).ok().and_then(|url| url.host_str().map(str::to_owned));

        if self.upstream.api_key.is_none()
            && default_host.is_some()
            && self.upstream.base_url.host_str() == default_host.as_deref()
        {
            anyhow::bail!(
                "upstream.api_key is required for {} (set it, e.g. api_key = \"{{{{ env.OPENROUTER_API_KEY }}}}\")",
                self.upstream.base_url
            );
        }

        Ok(())
    }
}
