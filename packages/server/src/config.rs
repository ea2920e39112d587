//! Environment-driven server configuration.
//!
//! Credentials for the individual upstream services are read by each
//! client's own `from_env` constructor; this covers the settings that
//! belong to the server itself.

use std::path::PathBuf;
use std::time::Duration;

use quiet_spaces_recommend::aggregator::DEFAULT_DEADLINE;
use quiet_spaces_recommend::{Rules, RulesError};

/// Server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Address to bind (`BIND_ADDR`, default `127.0.0.1`).
    pub bind_addr: String,
    /// Port to bind (`PORT`, default 8080).
    pub port: u16,
    /// Deadline for the recommendation fan-out
    /// (`RECOMMENDATION_TIMEOUT_SECS`, default 30).
    pub recommendation_timeout: Duration,
    /// Rule table override (`QUIET_SPACES_RULES`).
    pub rules_path: Option<PathBuf>,
}

impl ServiceConfig {
    /// Reads the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration from values looked up by name. Unset,
    /// blank, or unparseable values fall back to their defaults.
    #[must_use]
    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let port = var("PORT").and_then(|p| p.trim().parse().ok()).unwrap_or(8080);

        let recommendation_timeout = var("RECOMMENDATION_TIMEOUT_SECS")
            .and_then(|secs| {
                let parsed = secs.trim().parse::<u64>().ok().filter(|s| *s > 0);
                if parsed.is_none() {
                    log::warn!("Ignoring invalid RECOMMENDATION_TIMEOUT_SECS={secs}");
                }
                parsed
            })
            .map_or(DEFAULT_DEADLINE, Duration::from_secs);

        Self {
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            recommendation_timeout,
            rules_path: var("QUIET_SPACES_RULES").map(PathBuf::from),
        }
    }

    /// Loads the rule tables: the override file if one is configured,
    /// otherwise the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError`] if the override file cannot be read or parsed.
    pub fn load_rules(&self) -> Result<Rules, RulesError> {
        match &self.rules_path {
            Some(path) => {
                log::info!("Loading rule tables from {}", path.display());
                Rules::from_path(path)
            }
            None => Ok(Rules::embedded().clone()),
        }
    }
}
