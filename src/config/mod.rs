pub mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use anyhow::Result;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

impl GatewayConfig {
    /// Load configuration from a file (if it exists) and apply environment
    /// variable overrides for listener and client settings. When the file does
    /// not exist, built-in defaults are used: a gateway that answers every
    /// request with the catch-all 404.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: GatewayConfig = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::parse(&content, path.extension().and_then(|e| e.to_str()))?
        } else {
            tracing::info!("config file not found at {}, using defaults", path.display());
            GatewayConfig::default()
        };

        config.apply_env_overrides();

        config.validate()?;
        tracing::info!(
            rules = config.rules.len(),
            listen = %config.server.listen,
            "loaded gateway configuration"
        );
        Ok(config)
    }

    /// Parse config text in the format named by `extension`.
    pub fn parse(content: &str, extension: Option<&str>) -> Result<Self> {
        Ok(match extension {
            Some("toml") => toml::from_str(content)?,
            Some("json") => serde_json::from_str(content)?,
            Some(ext) => anyhow::bail!("unsupported config format: .{ext}, use .toml or .json"),
            None => anyhow::bail!("config file has no extension, use .toml or .json"),
        })
    }

    /// Environment overrides for deployment settings. Rules are only ever
    /// read from the config file.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TENT_LISTEN") {
            self.server.listen = v;
        }
        if let Ok(v) = std::env::var("TENT_ADMIN_LISTEN") {
            self.server.admin_listen = v;
        }
        if let Ok(v) = std::env::var("TENT_WORKERS") {
            if let Ok(n) = v.parse::<usize>() {
                self.server.workers = Some(n);
            }
        }
        if let Ok(v) = std::env::var("TENT_MAX_BODY_BYTES") {
            if let Ok(n) = v.parse::<u64>() {
                self.server.max_body_bytes = Some(n);
            }
        }
        if let Ok(v) = std::env::var("TENT_UPSTREAM_TIMEOUT") {
            self.upstream.timeout = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.listen.is_empty() {
            anyhow::bail!("server.listen must not be empty");
        }
        if self.server.workers == Some(0) {
            anyhow::bail!("server.workers must be at least 1");
        }
        self.upstream.timeout()?;
        self.upstream.connect_timeout()?;
        self.upstream.pool_idle_timeout()?;

        let mut names = HashSet::new();
        for (idx, rule) in self.rules.iter().enumerate() {
            let label = rule.label(idx);
            if let Some(ref name) = rule.name {
                if !names.insert(name.as_str()) {
                    anyhow::bail!("duplicate rule name '{}'", name);
                }
            }
            for m in &rule.matchers {
                if m.uri.as_deref() == Some("") {
                    anyhow::bail!("rule '{}' has a matcher with an empty uri", label);
                }
            }
            match &rule.handler {
                HandlerConfig::Proxy { host, .. } => {
                    if !(host.starts_with("http://") || host.starts_with("https://")) {
                        anyhow::bail!(
                            "rule '{}': proxy host '{}' must be an http:// or https:// URL",
                            label,
                            host
                        );
                    }
                    // Forwardable methods are checked when the rule is compiled.
                }
                HandlerConfig::Static { location, .. } => {
                    if location.as_os_str().is_empty() {
                        anyhow::bail!("rule '{}': static handler has an empty location", label);
                    }
                }
                HandlerConfig::Missing { .. } => {}
            }
        }
        Ok(())
    }
}

impl RuleConfig {
    /// Name used in logs and errors; unnamed rules are labelled by position.
    pub fn label(&self, idx: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("#{}", idx),
        }
    }
}

impl UpstreamClientConfig {
    pub fn timeout(&self) -> Result<Duration> {
        parse_duration("upstream.timeout", &self.timeout)
    }

    pub fn connect_timeout(&self) -> Result<Duration> {
        parse_duration("upstream.connect_timeout", &self.connect_timeout)
    }

    pub fn pool_idle_timeout(&self) -> Result<Duration> {
        parse_duration("upstream.pool_idle_timeout", &self.pool_idle_timeout)
    }
}

fn parse_duration(field: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value)
        .map_err(|e| anyhow::anyhow!("invalid duration for {}: '{}' ({})", field, value, e))
}
