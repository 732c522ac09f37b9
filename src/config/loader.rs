//! Configuration Loader
//!
//! Merges the environment preset, an optional TOML file, and
//! `TRADEGUARD__SECTION__FIELD` environment variables using the `config`
//! crate, then validates the result. Loading fails fast on any error.

use super::error::{ConfigResult, ConfigurationError};
use super::TradeguardConfig;
use std::env;
use std::path::Path;
use tracing::{debug, info};

const ENV_PREFIX: &str = "TRADEGUARD";
const ENV_SEPARATOR: &str = "__";

/// Get current environment from environment variables
pub fn detect_environment() -> String {
    env::var("TRADEGUARD_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

impl TradeguardConfig {
    /// Load configuration for the detected environment
    ///
    /// Sources, lowest precedence first:
    /// 1. preset for `TRADEGUARD_ENV`
    /// 2. `path` (TOML), when given
    /// 3. `TRADEGUARD__CACHE__L1_MAX_SIZE=...` style variables
    /// 4. `TRADEGUARD_REDIS_URL` / `REDIS_URL` / `TRADEGUARD_CACHE_BACKEND`
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        Self::load_with_env(path, &detect_environment())
    }

    /// Load configuration with an explicit environment name
    pub fn load_with_env(path: Option<&Path>, environment: &str) -> ConfigResult<Self> {
        let preset = Self::for_environment(environment);
        let mut builder = config::Config::builder().add_source(
            config::Config::try_from(&preset)
                .map_err(|e| ConfigurationError::load_error("environment preset", e))?,
        );

        if let Some(path) = path {
            debug!(path = %path.display(), "Adding configuration file source");
            if !path.exists() {
                return Err(ConfigurationError::load_error(
                    path.display().to_string(),
                    "file does not exist",
                ));
            }
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        );

        let mut loaded: Self = builder.build()?.try_deserialize()?;
        loaded.environment = environment.to_string();
        loaded.cache = loaded.cache.with_env_overrides();
        loaded.validate()?;

        info!(
            environment = %environment,
            backend = %loaded.cache.backend,
            l1_max_size = loaded.cache.l1_max_size,
            "Configuration loaded successfully"
        );

        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_preset_without_file() {
        let config = TradeguardConfig::load_with_env(None, "test").unwrap();
        assert_eq!(config.environment, "test");
        assert_eq!(config.cache.l1_max_size, 100);
    }

    #[test]
    fn test_file_overrides_preset() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[cache]
backend = "memory"
l1_max_size = 42

[cache.ttl_overrides]
forex = 15

[circuit_breakers.component_configs.news]
failure_threshold = 7
success_threshold = 1
recovery_timeout_seconds = 120
half_open_max_calls = 1
probe_timeout_seconds = 10
"#
        )
        .unwrap();

        let config = TradeguardConfig::load_with_env(Some(file.path()), "test").unwrap();
        assert_eq!(config.cache.l1_max_size, 42);
        assert_eq!(config.cache.ttl_overrides.get("forex"), Some(&15));
        assert_eq!(
            config
                .circuit_breakers
                .config_for_component("news")
                .failure_threshold,
            7
        );
        // Untouched preset sections survive the merge
        assert!(config
            .circuit_breakers
            .component_configs
            .contains_key("market_data"));
    }

    #[test]
    fn test_invalid_file_values_fail_fast() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[cache]\nl1_max_size = 0\nbackend = \"memory\"").unwrap();

        let result = TradeguardConfig::load_with_env(Some(file.path()), "test");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result =
            TradeguardConfig::load_with_env(Some(Path::new("/nonexistent/tradeguard.toml")), "test");
        assert!(matches!(result, Err(ConfigurationError::LoadError { .. })));
    }
}
